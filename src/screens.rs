//! Screens
//!
//! The node set of the navigation graph, along with the static per-screen
//! facts the controller consults: who may see a screen, where `back` leads,
//! and whether the bottom navigation bar is hidden on it.

use std::{fmt, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

use crate::roles::Role;

/// A screen name that is not part of the navigation graph.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown screen: {0}")]
pub struct UnknownScreen(pub String);

/// Every screen the views know how to render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Screen {
    /// Role picker shown on launch.
    #[default]
    ContinueAs,
    /// Customer onboarding carousel.
    CustomerIntro,
    /// Customer sign-up form.
    CustomerSignup,
    /// Customer login form.
    CustomerLogin,
    /// Location permission prompt.
    LocationAccess,
    /// Food preference picker.
    PreferencesSetup,
    /// Customer home feed.
    Home,
    /// Search results.
    Search,
    /// Map of nearby deals.
    MapView,
    /// A single deal.
    DealDetails,
    /// Reservation confirmation and pickup code.
    Checkout,
    /// Saved reservations.
    Reservations,
    /// Active and past orders.
    Orders,
    /// Favourite deals.
    Favourites,
    /// Account overview.
    Profile,
    /// Profile editor.
    EditProfile,
    /// Saved payment methods.
    PaymentMethods,
    /// Help and support.
    HelpCentre,
    /// Business partner login.
    BusinessLogin,
    /// Business onboarding wizard.
    BusinessSetup,
    /// Merchant dashboard.
    Merchant,
    /// Deal template library.
    DealTemplates,
    /// Single deal template editor.
    TemplateDetail,
}

/// Which sessions a screen belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Shown before sign-in, reached only through completion intents.
    Onboarding,

    /// Signed-in customers only.
    Customer,

    /// Signed-in businesses only.
    Business,

    /// Account screens shared by any signed-in role.
    Account,
}

impl Screen {
    /// All screens, in graph declaration order.
    pub const ALL: [Screen; 23] = [
        Screen::ContinueAs,
        Screen::CustomerIntro,
        Screen::CustomerSignup,
        Screen::CustomerLogin,
        Screen::LocationAccess,
        Screen::PreferencesSetup,
        Screen::Home,
        Screen::Search,
        Screen::MapView,
        Screen::DealDetails,
        Screen::Checkout,
        Screen::Reservations,
        Screen::Orders,
        Screen::Favourites,
        Screen::Profile,
        Screen::EditProfile,
        Screen::PaymentMethods,
        Screen::HelpCentre,
        Screen::BusinessLogin,
        Screen::BusinessSetup,
        Screen::Merchant,
        Screen::DealTemplates,
        Screen::TemplateDetail,
    ];

    /// Destinations offered by the customer bottom navigation bar.
    pub const BOTTOM_NAV: [Screen; 5] = [
        Screen::Home,
        Screen::Search,
        Screen::Orders,
        Screen::Favourites,
        Screen::Profile,
    ];

    /// Returns the kebab-case name views use for this screen.
    pub fn as_str(self) -> &'static str {
        match self {
            Screen::ContinueAs => "continue-as",
            Screen::CustomerIntro => "customer-intro",
            Screen::CustomerSignup => "customer-signup",
            Screen::CustomerLogin => "customer-login",
            Screen::LocationAccess => "location-access",
            Screen::PreferencesSetup => "preferences-setup",
            Screen::Home => "home",
            Screen::Search => "search",
            Screen::MapView => "map-view",
            Screen::DealDetails => "deal-details",
            Screen::Checkout => "checkout",
            Screen::Reservations => "reservations",
            Screen::Orders => "orders",
            Screen::Favourites => "favourites",
            Screen::Profile => "profile",
            Screen::EditProfile => "edit-profile",
            Screen::PaymentMethods => "payment-methods",
            Screen::HelpCentre => "help-centre",
            Screen::BusinessLogin => "business-login",
            Screen::BusinessSetup => "business-setup",
            Screen::Merchant => "merchant",
            Screen::DealTemplates => "deal-templates",
            Screen::TemplateDetail => "template-detail",
        }
    }

    /// Returns which sessions may show this screen.
    pub fn audience(self) -> Audience {
        match self {
            Screen::ContinueAs
            | Screen::CustomerIntro
            | Screen::CustomerSignup
            | Screen::CustomerLogin
            | Screen::LocationAccess
            | Screen::PreferencesSetup
            | Screen::BusinessLogin
            | Screen::BusinessSetup => Audience::Onboarding,
            Screen::Home
            | Screen::Search
            | Screen::MapView
            | Screen::DealDetails
            | Screen::Checkout
            | Screen::Reservations
            | Screen::Orders
            | Screen::Favourites => Audience::Customer,
            Screen::Profile | Screen::EditProfile | Screen::PaymentMethods | Screen::HelpCentre => {
                Audience::Account
            }
            Screen::Merchant | Screen::DealTemplates | Screen::TemplateDetail => Audience::Business,
        }
    }

    /// Whether a signed-in session with `role` may show this screen.
    ///
    /// Onboarding screens are never admitted here; they are only entered
    /// through their completion intents.
    pub fn admits(self, role: Role) -> bool {
        match (self.audience(), role) {
            (Audience::Customer, Role::Customer)
            | (Audience::Business, Role::Business)
            | (Audience::Account, Role::Customer | Role::Business) => true,
            (Audience::Onboarding, _)
            | (Audience::Customer, Role::Anonymous | Role::Business)
            | (Audience::Business, Role::Anonymous | Role::Customer)
            | (Audience::Account, Role::Anonymous) => false,
        }
    }

    /// The single screen `back` leads to, if the screen offers one.
    pub fn back_target(self) -> Option<Screen> {
        match self {
            Screen::CustomerSignup => Some(Screen::CustomerIntro),
            Screen::CustomerLogin | Screen::BusinessLogin => Some(Screen::ContinueAs),
            Screen::Search | Screen::MapView | Screen::DealDetails => Some(Screen::Home),
            Screen::Checkout => Some(Screen::DealDetails),
            Screen::EditProfile | Screen::PaymentMethods | Screen::HelpCentre | Screen::Merchant => {
                Some(Screen::Profile)
            }
            Screen::DealTemplates => Some(Screen::Merchant),
            Screen::TemplateDetail => Some(Screen::DealTemplates),
            Screen::ContinueAs
            | Screen::CustomerIntro
            | Screen::LocationAccess
            | Screen::PreferencesSetup
            | Screen::Home
            | Screen::Reservations
            | Screen::Orders
            | Screen::Favourites
            | Screen::Profile
            | Screen::BusinessSetup => None,
        }
    }

    /// Whether `navigate` may jump straight to this screen.
    pub fn is_jump_destination(self) -> bool {
        matches!(
            self,
            Screen::Home
                | Screen::Search
                | Screen::MapView
                | Screen::Reservations
                | Screen::Orders
                | Screen::Favourites
                | Screen::Profile
                | Screen::EditProfile
                | Screen::PaymentMethods
                | Screen::HelpCentre
                | Screen::Merchant
                | Screen::DealTemplates
                | Screen::TemplateDetail
        )
    }

    /// Whether the screen lists deals a customer can open.
    pub fn lists_deals(self) -> bool {
        matches!(
            self,
            Screen::Home
                | Screen::Search
                | Screen::MapView
                | Screen::Reservations
                | Screen::Orders
                | Screen::Favourites
        )
    }

    /// Whether the bottom navigation bar is hidden on this screen.
    pub fn hides_bottom_nav(self) -> bool {
        matches!(
            self,
            Screen::DealDetails
                | Screen::Checkout
                | Screen::EditProfile
                | Screen::PaymentMethods
                | Screen::HelpCentre
                | Screen::MapView
                | Screen::Orders
        )
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Screen {
    type Err = UnknownScreen;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Screen::ALL
            .into_iter()
            .find(|screen| screen.as_str() == s)
            .ok_or_else(|| UnknownScreen(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn names_round_trip_through_from_str() -> TestResult {
        for screen in Screen::ALL {
            assert_eq!(screen.as_str().parse::<Screen>()?, screen);
        }

        Ok(())
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "checkout-v2".parse::<Screen>().err();

        assert_eq!(err, Some(UnknownScreen("checkout-v2".to_string())));
    }

    #[test]
    fn default_screen_is_continue_as() {
        assert_eq!(Screen::default(), Screen::ContinueAs);
    }

    #[test]
    fn merchant_screens_only_admit_businesses() {
        for screen in [Screen::Merchant, Screen::DealTemplates, Screen::TemplateDetail] {
            assert!(screen.admits(Role::Business));
            assert!(!screen.admits(Role::Customer));
            assert!(!screen.admits(Role::Anonymous));
        }
    }

    #[test]
    fn account_screens_admit_both_roles() {
        assert!(Screen::Profile.admits(Role::Customer));
        assert!(Screen::Profile.admits(Role::Business));
        assert!(!Screen::Profile.admits(Role::Anonymous));
    }

    #[test]
    fn onboarding_screens_are_never_admitted() {
        for screen in Screen::ALL
            .into_iter()
            .filter(|screen| screen.audience() == Audience::Onboarding)
        {
            assert!(!screen.admits(Role::Customer));
            assert!(!screen.admits(Role::Business));
        }
    }

    #[test]
    fn back_targets_are_fixed_edges() {
        assert_eq!(Screen::EditProfile.back_target(), Some(Screen::Profile));
        assert_eq!(Screen::DealTemplates.back_target(), Some(Screen::Merchant));
        assert_eq!(Screen::Checkout.back_target(), Some(Screen::DealDetails));
        assert_eq!(Screen::Home.back_target(), None);
    }

    #[test]
    fn bottom_nav_destinations_are_jump_destinations() {
        for screen in Screen::BOTTOM_NAV {
            assert!(screen.is_jump_destination(), "{screen} should be navigable");
        }
    }

    #[test]
    fn onboarding_screens_are_not_jump_destinations() {
        for screen in Screen::ALL {
            if screen.audience() == Audience::Onboarding {
                assert!(!screen.is_jump_destination(), "{screen} should not be navigable");
            }
        }
    }
}
