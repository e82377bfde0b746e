//! Integration tests for the business partner flow

use jiff::{SignedDuration, Timestamp};
use testresult::TestResult;

use foodloop::{
    catalog::Catalog,
    config::SessionConfig,
    controller::{Controller, ControllerError},
    roles::Role,
    screens::Screen,
    session::{Intent, NavigationError},
};

fn signed_in_business() -> Result<Controller, ControllerError> {
    let start = Timestamp::UNIX_EPOCH;
    let catalog = Catalog::bundled(start)?;
    let mut controller = Controller::new(catalog, SessionConfig::default(), start)?;

    controller.dispatch(&Intent::SelectBusiness, start)?;
    controller.dispatch(&Intent::CompleteBusinessLogin, start)?;

    Ok(controller)
}

#[test]
fn business_lands_on_merchant_without_bottom_nav() -> TestResult {
    let controller = signed_in_business()?;
    let session = controller.session();

    assert_eq!(session.screen(), Screen::Merchant);
    assert_eq!(session.role(), Role::Business);
    assert!(session.is_signed_in());
    assert!(!session.show_bottom_nav());

    Ok(())
}

#[test]
fn template_screens_navigate_and_back_out() -> TestResult {
    let mut controller = signed_in_business()?;
    let now = Timestamp::UNIX_EPOCH;

    controller.dispatch(&Intent::Navigate(Screen::DealTemplates), now)?;
    controller.dispatch(&Intent::Navigate(Screen::TemplateDetail), now)?;

    let session = controller.dispatch(&Intent::Back, now)?;
    assert_eq!(session.screen(), Screen::DealTemplates);

    let session = controller.dispatch(&Intent::Back, now)?;
    assert_eq!(session.screen(), Screen::Merchant);

    let session = controller.dispatch(&Intent::Back, now)?;
    assert_eq!(session.screen(), Screen::Profile);

    let session = controller.dispatch(&Intent::Navigate(Screen::HelpCentre), now)?;
    assert_eq!(session.screen(), Screen::HelpCentre);

    Ok(())
}

#[test]
fn customer_screens_are_rejected_for_businesses() -> TestResult {
    let mut controller = signed_in_business()?;
    let now = Timestamp::UNIX_EPOCH;

    for screen in [Screen::Home, Screen::Search, Screen::Orders, Screen::Favourites] {
        let result = controller.dispatch(&Intent::Navigate(screen), now);

        assert!(
            matches!(
                result,
                Err(ControllerError::Navigation(NavigationError::Forbidden { .. }))
            ),
            "{screen} should be rejected"
        );
        assert_eq!(controller.session().screen(), Screen::Merchant);
    }

    Ok(())
}

#[test]
fn business_setup_is_an_alternative_to_login() -> TestResult {
    let start = Timestamp::UNIX_EPOCH;
    let catalog = Catalog::bundled(start)?;
    let mut controller = Controller::new(catalog, SessionConfig::default(), start)?;

    controller.dispatch(&Intent::SelectBusiness, start)?;

    let session = controller.dispatch(&Intent::StartBusinessSetup, start)?;
    assert_eq!(session.screen(), Screen::BusinessSetup);

    let session = controller.dispatch(&Intent::CompleteBusinessSetup, start)?;
    assert_eq!(session.screen(), Screen::Merchant);
    assert!(session.is_signed_in());

    Ok(())
}

#[test]
fn leaving_business_login_resets_the_role() -> TestResult {
    let start = Timestamp::UNIX_EPOCH;
    let catalog = Catalog::bundled(start)?;
    let mut controller = Controller::new(catalog, SessionConfig::default(), start)?;

    controller.dispatch(&Intent::SelectBusiness, start)?;
    let session = controller.dispatch(&Intent::Back, start)?;

    assert_eq!(session.screen(), Screen::ContinueAs);
    assert_eq!(session.role(), Role::Anonymous);

    let session = controller.dispatch(&Intent::SelectCustomer, start)?;
    assert_eq!(session.role(), Role::Customer);

    Ok(())
}

#[test]
fn listing_countdowns_use_hours_and_minutes() -> TestResult {
    let controller = signed_in_business()?;
    let now = Timestamp::UNIX_EPOCH.checked_add(SignedDuration::from_mins(30))?;

    let listings = controller.merchant_listings(now)?;
    let rows: Vec<(&str, &str)> = listings
        .iter()
        .map(|listing| (listing.deal.id.as_str(), listing.label.as_str()))
        .collect();

    assert_eq!(
        rows,
        vec![("1", "52m"), ("2", "1h 35m"), ("3", "1h 5m"), ("4", "3h 0m")]
    );

    let much_later = Timestamp::UNIX_EPOCH.checked_add(SignedDuration::from_hours(5))?;
    let listings = controller.merchant_listings(much_later)?;

    assert!(listings.iter().all(|listing| listing.remaining == 0));
    assert!(listings.iter().all(|listing| listing.label == "0m"));

    Ok(())
}
