//! Integration tests for the customer onboarding and reservation flow

use jiff::{SignedDuration, Timestamp};
use testresult::TestResult;

use foodloop::{
    catalog::Catalog,
    config::SessionConfig,
    controller::{Controller, ControllerError, SessionEvent},
    orders::{OrderStatus, pickup_code::PickupCode},
    roles::Role,
    screens::Screen,
    session::{Intent, NavigationError},
};

fn controller(start: Timestamp) -> Result<Controller, ControllerError> {
    let catalog = Catalog::bundled(start)?;

    Controller::new(catalog, SessionConfig::default(), start)
}

fn sign_in_customer(controller: &mut Controller, now: Timestamp) -> Result<(), ControllerError> {
    for intent in [
        Intent::SelectCustomer,
        Intent::CompleteOnboarding,
        Intent::CompleteSignup,
        Intent::CompleteLogin,
        Intent::CompleteLocation,
        Intent::CompletePreferences,
    ] {
        controller.dispatch(&intent, now)?;
    }

    Ok(())
}

#[test]
fn onboarding_walks_every_step_to_home() -> TestResult {
    let start = Timestamp::UNIX_EPOCH;
    let mut controller = controller(start)?;

    let session = controller.dispatch(&Intent::SelectCustomer, start)?;
    assert_eq!(session.screen(), Screen::CustomerIntro);
    assert_eq!(session.role(), Role::Customer);
    assert!(!session.is_signed_in());

    let session = controller.dispatch(&Intent::CompleteOnboarding, start)?;
    assert_eq!(session.screen(), Screen::CustomerSignup);

    let session = controller.dispatch(&Intent::CompleteSignup, start)?;
    assert_eq!(session.screen(), Screen::CustomerLogin);

    let session = controller.dispatch(&Intent::CompleteLogin, start)?;
    assert_eq!(session.screen(), Screen::LocationAccess);

    let session = controller.dispatch(&Intent::CompleteLocation, start)?;
    assert_eq!(session.screen(), Screen::PreferencesSetup);
    assert!(!session.show_bottom_nav());

    let session = controller.dispatch(&Intent::CompletePreferences, start)?;
    assert_eq!(session.screen(), Screen::Home);
    assert!(session.is_signed_in());
    assert!(session.show_bottom_nav());

    Ok(())
}

#[test]
fn signup_and_login_forms_link_to_each_other() -> TestResult {
    let start = Timestamp::UNIX_EPOCH;
    let mut controller = controller(start)?;

    controller.dispatch(&Intent::SelectCustomer, start)?;
    controller.dispatch(&Intent::CompleteOnboarding, start)?;

    let session = controller.dispatch(&Intent::SwitchToLogin, start)?;
    assert_eq!(session.screen(), Screen::CustomerLogin);

    let session = controller.dispatch(&Intent::SwitchToSignup, start)?;
    assert_eq!(session.screen(), Screen::CustomerSignup);

    let session = controller.dispatch(&Intent::Back, start)?;
    assert_eq!(session.screen(), Screen::CustomerIntro);

    Ok(())
}

#[test]
fn reserving_a_deal_confirms_after_the_delay() -> TestResult {
    let start = Timestamp::UNIX_EPOCH;
    let mut controller = controller(start)?;
    sign_in_customer(&mut controller, start)?;

    let session = controller.dispatch(&Intent::ViewDeal("1".into()), start)?;
    let selected = session
        .selected_deal()
        .and_then(|key| controller.catalog().get(key))
        .ok_or("no deal selected")?;

    assert_eq!(session.screen(), Screen::DealDetails);
    assert_eq!(selected.id, "1");
    assert!(!session.show_bottom_nav());

    let session = controller.dispatch(&Intent::ReserveDeal("1".into()), start)?;
    let order = session.active_reservation().ok_or("no reservation")?;

    assert_eq!(session.screen(), Screen::Checkout);
    assert_eq!(controller.orders().len(), 1);
    assert_eq!(
        controller.orders().get(order).map(|o| o.status()),
        Some(OrderStatus::Confirming)
    );

    let just_before = start.checked_add(SignedDuration::from_millis(1499))?;
    assert!(controller.advance_to(just_before)?.is_empty());

    let confirmed_at = start.checked_add(SignedDuration::from_millis(1500))?;
    let events = controller.advance_to(confirmed_at)?;

    let Some(SessionEvent::OrderConfirmed {
        pickup_code,
        time_remaining,
        ..
    }) = events.first()
    else {
        return Err("expected a confirmation".into());
    };

    assert_eq!(*time_remaining, 3600);
    assert_eq!(pickup_code.as_str().parse::<PickupCode>()?, *pickup_code);

    let view = controller.view(confirmed_at);
    let active = view.active_order.ok_or("no active order")?;

    assert_eq!(active.order.status(), OrderStatus::Confirmed);
    assert_eq!(active.time_remaining, Some(3600));
    assert_eq!(active.countdown.as_deref(), Some("1:00:00"));
    assert_eq!(active.deal.map(|deal| deal.title.as_str()), Some("Strawberry Bliss Pancakes"));

    Ok(())
}

#[test]
fn checkout_leads_to_orders_list() -> TestResult {
    let start = Timestamp::UNIX_EPOCH;
    let mut controller = controller(start)?;
    sign_in_customer(&mut controller, start)?;

    controller.dispatch(&Intent::ViewDeal("2".into()), start)?;
    controller.dispatch(&Intent::ReserveDeal("2".into()), start)?;

    let later = start.checked_add(SignedDuration::from_secs(5))?;
    let session = controller.dispatch(&Intent::CompleteCheckout, later)?;

    assert_eq!(session.screen(), Screen::Orders);
    assert!(!session.show_bottom_nav());
    assert_eq!(controller.orders().active().len(), 1);
    assert!(controller.orders().past().is_empty());

    let session = controller.dispatch(&Intent::Navigate(Screen::Home), later)?;
    assert!(session.show_bottom_nav());

    Ok(())
}

#[test]
fn unknown_deal_falls_back_to_the_default() -> TestResult {
    let start = Timestamp::UNIX_EPOCH;
    let mut controller = controller(start)?;
    sign_in_customer(&mut controller, start)?;

    let session = controller.dispatch(&Intent::ViewDeal("does-not-exist".into()), start)?;
    let selected = session
        .selected_deal()
        .and_then(|key| controller.catalog().get(key))
        .ok_or("no deal selected")?;

    assert_eq!(session.screen(), Screen::DealDetails);
    assert_eq!(selected.id, "1");

    Ok(())
}

#[test]
fn guard_violations_keep_the_current_screen() -> TestResult {
    let start = Timestamp::UNIX_EPOCH;
    let mut controller = controller(start)?;
    sign_in_customer(&mut controller, start)?;

    let result = controller.dispatch(&Intent::Navigate(Screen::DealTemplates), start);

    assert!(matches!(
        result,
        Err(ControllerError::Navigation(NavigationError::Forbidden {
            screen: Screen::DealTemplates,
            role: Role::Customer
        }))
    ));
    assert_eq!(controller.session().screen(), Screen::Home);

    Ok(())
}

#[test]
fn every_bottom_nav_destination_is_reachable() -> TestResult {
    let start = Timestamp::UNIX_EPOCH;
    let mut controller = controller(start)?;
    sign_in_customer(&mut controller, start)?;

    for screen in Screen::BOTTOM_NAV {
        let session = controller.dispatch(&Intent::Navigate(screen), start)?;

        assert_eq!(session.screen(), screen);
        assert_eq!(session.show_bottom_nav(), screen != Screen::Orders);
    }

    Ok(())
}

#[test]
fn logout_returns_to_continue_as() -> TestResult {
    let start = Timestamp::UNIX_EPOCH;
    let mut controller = controller(start)?;
    sign_in_customer(&mut controller, start)?;

    let session = controller.dispatch(&Intent::Logout, start)?;

    assert_eq!(session.screen(), Screen::ContinueAs);
    assert_eq!(session.role(), Role::Anonymous);
    assert!(!session.is_signed_in());

    Ok(())
}
