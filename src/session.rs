//! Session
//!
//! The session is a small value; intents never mutate it in place. A
//! transition either returns the next session (and any side effect the
//! controller must carry out) or a [`NavigationError`] leaving the current
//! one untouched.

use std::fmt;

use thiserror::Error;

use crate::{
    catalog::{Catalog, DealKey},
    orders::OrderKey,
    roles::Role,
    screens::Screen,
};

/// Rejected transitions.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum NavigationError {
    /// The intent has no edge from the current screen
    #[error("{intent} is not available on {screen}")]
    UnexpectedIntent {
        /// Intent name
        intent: &'static str,
        /// Screen it was sent from
        screen: Screen,
    },

    /// The role may not see the screen
    #[error("{screen} is not available to {role} sessions")]
    Forbidden {
        /// Requested screen
        screen: Screen,
        /// Current role
        role: Role,
    },

    /// Jumps need a signed-in session
    #[error("sign in before opening {0}")]
    NotSignedIn(Screen),

    /// The screen is only entered through its own flow
    #[error("{0} cannot be opened directly")]
    NotNavigable(Screen),

    /// The screen declares no back target
    #[error("{0} has no back target")]
    NoBackTarget(Screen),
}

/// Something a view asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Pick the customer role on `continue-as`.
    SelectCustomer,
    /// Pick the business role on `continue-as`.
    SelectBusiness,
    /// Finish the customer intro carousel.
    CompleteOnboarding,
    /// Submit the sign-up form.
    CompleteSignup,
    /// Go from sign-up to login.
    SwitchToLogin,
    /// Go from login to sign-up.
    SwitchToSignup,
    /// Submit the customer login form.
    CompleteLogin,
    /// Answer the location prompt.
    CompleteLocation,
    /// Save food preferences; signs the customer in.
    CompletePreferences,
    /// Submit the business login form; signs the business in.
    CompleteBusinessLogin,
    /// Start onboarding a new business.
    StartBusinessSetup,
    /// Finish business onboarding; signs the business in.
    CompleteBusinessSetup,
    /// Open a deal by catalog id.
    ViewDeal(String),
    /// Reserve a deal by catalog id.
    ReserveDeal(String),
    /// Leave checkout for the orders list.
    CompleteCheckout,
    /// Jump to a destination screen.
    Navigate(Screen),
    /// Follow the current screen's back edge.
    Back,
    /// Sign out and start over.
    Logout,
}

impl Intent {
    /// Intent name as reported by views.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::SelectCustomer => "selectCustomer",
            Intent::SelectBusiness => "selectBusiness",
            Intent::CompleteOnboarding => "completeOnboarding",
            Intent::CompleteSignup => "completeSignup",
            Intent::SwitchToLogin => "switchToLogin",
            Intent::SwitchToSignup => "switchToSignup",
            Intent::CompleteLogin => "completeLogin",
            Intent::CompleteLocation => "completeLocation",
            Intent::CompletePreferences => "completePreferences",
            Intent::CompleteBusinessLogin => "completeBusinessLogin",
            Intent::StartBusinessSetup => "startBusinessSetup",
            Intent::CompleteBusinessSetup => "completeBusinessSetup",
            Intent::ViewDeal(_) => "viewDeal",
            Intent::ReserveDeal(_) => "reserveDeal",
            Intent::CompleteCheckout => "completeCheckout",
            Intent::Navigate(_) => "navigate",
            Intent::Back => "back",
            Intent::Logout => "logout",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::ViewDeal(id) | Intent::ReserveDeal(id) => write!(f, "{}({id})", self.name()),
            Intent::Navigate(screen) => write!(f, "{}({screen})", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

/// Side effects the controller performs when committing a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Create a `Confirming` order for the deal.
    Reserve(DealKey),
}

/// Outcome of an accepted intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// The next session
    pub session: Session,

    /// Work to do before the next session becomes current
    pub effect: Option<Effect>,
}

impl From<Session> for Transition {
    fn from(session: Session) -> Self {
        Transition {
            session,
            effect: None,
        }
    }
}

/// Session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    screen: Screen,
    role: Role,
    signed_in: bool,
    selected_deal: Option<DealKey>,
    active_reservation: Option<OrderKey>,
}

impl Session {
    /// The launch state: `continue-as`, anonymous, signed out.
    #[must_use]
    pub fn new() -> Self {
        Session::default()
    }

    /// Screen currently showing.
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Role picked on `continue-as`.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether onboarding or login has completed.
    pub fn is_signed_in(&self) -> bool {
        self.signed_in
    }

    /// Deal being viewed or reserved.
    pub fn selected_deal(&self) -> Option<DealKey> {
        self.selected_deal
    }

    /// Order created by the latest reservation.
    pub fn active_reservation(&self) -> Option<OrderKey> {
        self.active_reservation
    }

    /// Whether the customer bottom navigation bar is shown.
    pub fn show_bottom_nav(&self) -> bool {
        self.signed_in && self.role == Role::Customer && !self.screen.hides_bottom_nav()
    }

    /// Record the order created for this session's reservation.
    #[must_use]
    pub fn with_reservation(self, order: OrderKey) -> Self {
        Session {
            active_reservation: Some(order),
            ..self
        }
    }

    /// Work out where `intent` leads from this session.
    ///
    /// Unknown deal ids resolve to the catalog's default deal.
    ///
    /// # Errors
    ///
    /// Returns a [`NavigationError`] if the intent has no edge from the
    /// current screen or a guard rejects it.
    pub fn transition(
        &self,
        intent: &Intent,
        catalog: &Catalog,
    ) -> Result<Transition, NavigationError> {
        let transition = match intent {
            Intent::SelectCustomer => {
                self.expect(intent, Screen::ContinueAs)?;

                Session {
                    screen: Screen::CustomerIntro,
                    role: Role::Customer,
                    ..Session::default()
                }
                .into()
            }
            Intent::SelectBusiness => {
                self.expect(intent, Screen::ContinueAs)?;

                Session {
                    screen: Screen::BusinessLogin,
                    role: Role::Business,
                    ..Session::default()
                }
                .into()
            }
            Intent::CompleteOnboarding => {
                self.expect(intent, Screen::CustomerIntro)?;
                self.moved_to(Screen::CustomerSignup).into()
            }
            Intent::CompleteSignup | Intent::SwitchToLogin => {
                self.expect(intent, Screen::CustomerSignup)?;
                self.moved_to(Screen::CustomerLogin).into()
            }
            Intent::SwitchToSignup => {
                self.expect(intent, Screen::CustomerLogin)?;
                self.moved_to(Screen::CustomerSignup).into()
            }
            Intent::CompleteLogin => {
                self.expect(intent, Screen::CustomerLogin)?;
                self.moved_to(Screen::LocationAccess).into()
            }
            Intent::CompleteLocation => {
                self.expect(intent, Screen::LocationAccess)?;
                self.moved_to(Screen::PreferencesSetup).into()
            }
            Intent::CompletePreferences => {
                self.expect(intent, Screen::PreferencesSetup)?;
                self.signed_in_as(Role::Customer, Screen::Home).into()
            }
            Intent::CompleteBusinessLogin => {
                self.expect(intent, Screen::BusinessLogin)?;
                self.signed_in_as(Role::Business, Screen::Merchant).into()
            }
            Intent::StartBusinessSetup => {
                self.expect(intent, Screen::BusinessLogin)?;
                self.moved_to(Screen::BusinessSetup).into()
            }
            Intent::CompleteBusinessSetup => {
                self.expect(intent, Screen::BusinessSetup)?;
                self.signed_in_as(Role::Business, Screen::Merchant).into()
            }
            Intent::ViewDeal(id) => {
                if !self.screen.lists_deals() {
                    return Err(self.unexpected(intent));
                }

                let deal = catalog.resolve(id);

                Session {
                    screen: Screen::DealDetails,
                    selected_deal: Some(deal),
                    ..*self
                }
                .into()
            }
            Intent::ReserveDeal(id) => {
                self.expect(intent, Screen::DealDetails)?;

                let deal = catalog.resolve(id);

                Transition {
                    session: Session {
                        screen: Screen::Checkout,
                        selected_deal: Some(deal),
                        ..*self
                    },
                    effect: Some(Effect::Reserve(deal)),
                }
            }
            Intent::CompleteCheckout => {
                self.expect(intent, Screen::Checkout)?;
                self.moved_to(Screen::Orders).into()
            }
            Intent::Navigate(target) => self.jump_to(*target)?.into(),
            Intent::Back => self.back()?.into(),
            Intent::Logout => Session::default().into(),
        };

        Ok(transition)
    }

    fn expect(&self, intent: &Intent, screen: Screen) -> Result<(), NavigationError> {
        if self.screen == screen {
            Ok(())
        } else {
            Err(self.unexpected(intent))
        }
    }

    fn unexpected(&self, intent: &Intent) -> NavigationError {
        NavigationError::UnexpectedIntent {
            intent: intent.name(),
            screen: self.screen,
        }
    }

    fn moved_to(&self, screen: Screen) -> Session {
        Session { screen, ..*self }
    }

    fn signed_in_as(&self, role: Role, screen: Screen) -> Session {
        Session {
            screen,
            role,
            signed_in: true,
            ..*self
        }
    }

    fn jump_to(&self, target: Screen) -> Result<Session, NavigationError> {
        if !self.signed_in {
            return Err(NavigationError::NotSignedIn(target));
        }

        if !target.is_jump_destination() {
            return Err(NavigationError::NotNavigable(target));
        }

        if !target.admits(self.role) {
            return Err(NavigationError::Forbidden {
                screen: target,
                role: self.role,
            });
        }

        Ok(self.moved_to(target))
    }

    fn back(&self) -> Result<Session, NavigationError> {
        let target = self
            .screen
            .back_target()
            .ok_or(NavigationError::NoBackTarget(self.screen))?;

        if target == Screen::ContinueAs {
            return Ok(Session::default());
        }

        if self.signed_in && !target.admits(self.role) {
            return Err(NavigationError::Forbidden {
                screen: target,
                role: self.role,
            });
        }

        Ok(self.moved_to(target))
    }
}
