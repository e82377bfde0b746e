//! Replaying a walkthrough against a session

use std::{fs, io, path::Path};

use jiff::Timestamp;
use thiserror::Error;
use tracing::{debug, info, warn};

use foodloop::{
    catalog::{Catalog, CatalogError},
    config::{ConfigError, SessionConfig},
    controller::{Controller, ControllerError, SessionEvent},
    orders::{Order, OrderKey, countdown::format_pickup_countdown},
};

use crate::{
    config::CliConfig,
    script::{Action, Script, ScriptError},
};

/// Errors raised while preparing or replaying a walkthrough.
#[derive(Debug, Error)]
pub(crate) enum ReplayError {
    /// Could not read an input file
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path
        path: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Catalog error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Session config error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Script error
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Controller error that is not a rejected step
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Time arithmetic error
    #[error(transparent)]
    Time(#[from] jiff::Error),
}

/// Drives a controller through a script on a simulated clock.
#[derive(Debug)]
pub(crate) struct Replay {
    controller: Controller,
    now: Timestamp,
    realtime: bool,
    rejected: usize,
}

impl Replay {
    pub(crate) fn new(controller: Controller, realtime: bool) -> Self {
        let now = controller.clock();

        Replay {
            controller,
            now,
            realtime,
            rejected: 0,
        }
    }

    /// Build the controller and script named by the command line.
    pub(crate) fn load(config: &CliConfig, start: Timestamp) -> Result<(Self, Script), ReplayError> {
        let catalog = match &config.catalog {
            Some(path) => Catalog::from_yaml(&read(path)?, start)?,
            None => Catalog::bundled(start)?,
        };

        let mut session = match &config.session_config {
            Some(path) => SessionConfig::from_yaml(&read(path)?)?,
            None => SessionConfig::default(),
        };

        if let Some(seed) = config.replay.seed {
            session.pickup_code_seed = Some(seed);
        }

        let script = match &config.replay.script {
            Some(path) => Script::from_yaml(&read(path)?)?,
            None => Script::bundled()?,
        };

        info!(
            deals = catalog.len(),
            steps = script.steps().len(),
            realtime = config.replay.realtime,
            "loaded walkthrough"
        );

        let controller = Controller::new(catalog, session, start)?;

        Ok((Self::new(controller, config.replay.realtime), script))
    }

    /// Run every step in order. Rejected steps are logged and skipped.
    pub(crate) async fn run(&mut self, script: &Script) -> Result<(), ReplayError> {
        for (index, step) in script.steps().iter().enumerate() {
            if step.wait.is_positive() {
                if self.realtime {
                    tokio::time::sleep(step.wait.unsigned_abs()).await;
                }

                self.now = self.now.checked_add(step.wait)?;
            }

            match self.apply(&step.action) {
                Ok(()) => {}
                Err(error) if is_rejection(&error) => {
                    warn!(step = index, %error, "step rejected");
                    self.rejected += 1;
                }
                Err(error) => return Err(error.into()),
            }

            for event in self.controller.advance_to(self.now)? {
                self.log_event(&event);
            }

            debug!(
                step = index,
                screen = %self.controller.session().screen(),
                cart_items = self.controller.cart().item_count(),
                "step applied"
            );
        }

        info!(
            steps = script.steps().len(),
            rejected = self.rejected,
            screen = %self.controller.session().screen(),
            "walkthrough complete"
        );

        Ok(())
    }

    fn apply(&mut self, action: &Action) -> Result<(), ControllerError> {
        let now = self.now;

        match action {
            Action::Dispatch(intent) => {
                self.controller.dispatch(intent, now)?;
            }
            Action::Navigate(name) => {
                self.controller.navigate_named(name, now)?;
            }
            Action::AddToCart { deal, quantity } => {
                let total = self.controller.add_to_cart(deal, *quantity)?;
                info!(%deal, quantity = total, "added to cart");
            }
            Action::UpdateQuantity { deal, delta } => {
                match self.controller.update_cart_quantity(deal, *delta)? {
                    Some(quantity) => info!(%deal, quantity, "updated cart"),
                    None => warn!(%deal, "deal is not in the cart"),
                }
            }
            Action::RemoveItem(deal) => {
                if self.controller.remove_from_cart(deal)? {
                    info!(%deal, "removed from cart");
                }
            }
            Action::ConfirmPickup => match self.newest_active_order() {
                Some(order) => self.controller.confirm_pickup(order, now)?,
                None => warn!("no active order to collect"),
            },
            Action::CancelOrder => match self.newest_active_order() {
                Some(order) => self.controller.cancel_order(order, now)?,
                None => warn!("no active order to cancel"),
            },
            Action::Wait => {}
        }

        Ok(())
    }

    fn newest_active_order(&self) -> Option<OrderKey> {
        self.controller
            .orders()
            .active()
            .first()
            .map(|(key, _)| *key)
    }

    fn log_event(&self, event: &SessionEvent) {
        let reference = |order: &OrderKey| {
            self.controller
                .orders()
                .get(*order)
                .map(Order::reference)
                .unwrap_or_default()
        };

        match event {
            SessionEvent::OrderConfirmed {
                order,
                pickup_code,
                time_remaining,
            } => info!(
                order = %reference(order),
                %pickup_code,
                countdown = %format_pickup_countdown(*time_remaining),
                "order confirmed"
            ),
            SessionEvent::CountdownTicked {
                order,
                time_remaining,
            } => debug!(
                order = %reference(order),
                countdown = %format_pickup_countdown(*time_remaining),
                "countdown ticked"
            ),
            SessionEvent::CountdownElapsed { order } => {
                warn!(order = %reference(order), "pickup window elapsed");
            }
        }
    }

    pub(crate) fn controller(&self) -> &Controller {
        &self.controller
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.now
    }

    pub(crate) fn rejected(&self) -> usize {
        self.rejected
    }
}

/// Errors a user action can cause without the walkthrough being broken.
fn is_rejection(error: &ControllerError) -> bool {
    matches!(
        error,
        ControllerError::Navigation(_)
            | ControllerError::Order(_)
            | ControllerError::Cart(_)
            | ControllerError::CustomerOnly(_)
            | ControllerError::BusinessOnly(_)
    )
}

fn read(path: &Path) -> Result<String, ReplayError> {
    fs::read_to_string(path).map_err(|source| ReplayError::Read {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use foodloop::{orders::OrderStatus, screens::Screen, session::Intent};
    use jiff::SignedDuration;
    use testresult::TestResult;

    use super::*;

    fn replay() -> Result<Replay, ReplayError> {
        let start = Timestamp::UNIX_EPOCH;
        let catalog = Catalog::bundled(start)?;
        let config = SessionConfig {
            pickup_code_seed: Some(11),
            ..SessionConfig::default()
        };

        Ok(Replay::new(Controller::new(catalog, config, start)?, false))
    }

    #[tokio::test]
    async fn bundled_walkthrough_ends_with_a_confirmed_order() -> TestResult {
        let mut replay = replay()?;

        replay.run(&Script::bundled()?).await?;

        let controller = replay.controller();
        let active = controller.orders().active();
        let (_, order) = active.first().ok_or("no active order")?;

        assert_eq!(replay.rejected(), 0);
        assert_eq!(controller.session().screen(), Screen::Home);
        assert_eq!(active.len(), 1);
        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert!(order.pickup_code().is_some());
        assert_eq!(
            replay.now(),
            Timestamp::UNIX_EPOCH.checked_add(SignedDuration::from_millis(8900))?
        );

        Ok(())
    }

    #[tokio::test]
    async fn rejected_steps_do_not_stop_the_walkthrough() -> TestResult {
        let mut replay = replay()?;
        let script = Script::from_yaml(
            r#"
steps:
  - intent: completeCheckout
  - intent: addToCart
    deal: "1"
  - intent: selectCustomer
"#,
        )?;

        replay.run(&script).await?;

        assert_eq!(replay.rejected(), 2);
        assert_eq!(replay.controller().session().screen(), Screen::CustomerIntro);

        Ok(())
    }

    #[tokio::test]
    async fn waits_advance_the_simulated_clock() -> TestResult {
        let mut replay = replay()?;
        let script = Script::from_yaml("steps:\n  - intent: wait\n    wait_ms: 1500\n")?;

        replay.run(&script).await?;

        assert_eq!(
            replay.now(),
            Timestamp::UNIX_EPOCH.checked_add(SignedDuration::from_millis(1500))?
        );
        assert_eq!(replay.controller().clock(), replay.now());

        Ok(())
    }

    #[test]
    fn unknown_screens_are_ignored() -> TestResult {
        let mut replay = replay()?;

        replay.apply(&Action::Dispatch(Intent::SelectCustomer))?;
        replay.apply(&Action::Navigate("nowhere".into()))?;

        assert_eq!(replay.controller().session().screen(), Screen::CustomerIntro);

        Ok(())
    }
}
