//! Walkthrough scripts

use jiff::SignedDuration;
use serde::Deserialize;
use thiserror::Error;

use foodloop::session::Intent;

const BUNDLED_WALKTHROUGH: &str = include_str!("../../../fixtures/walkthrough.yml");

/// Errors raised while loading a walkthrough script.
#[derive(Debug, Error)]
pub(crate) enum ScriptError {
    /// YAML parsing error
    #[error(transparent)]
    Yaml(#[from] serde_norway::Error),

    /// Unrecognised intent name
    #[error("Step {step}: unknown intent {intent:?}")]
    UnknownIntent {
        /// Step index
        step: usize,
        /// Intent name as written
        intent: String,
    },

    /// Intent is missing a required field
    #[error("Step {step}: {intent} needs a {field}")]
    MissingField {
        /// Step index
        step: usize,
        /// Intent name
        intent: &'static str,
        /// Missing field
        field: &'static str,
    },

    /// Quantity cannot be added to a cart
    #[error("Step {step}: invalid quantity {quantity}")]
    InvalidQuantity {
        /// Step index
        step: usize,
        /// Quantity as written
        quantity: i64,
    },
}

/// What a step does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    /// Report an intent to the session.
    Dispatch(Intent),

    /// Navigate by screen name; unknown names are ignored by the session.
    Navigate(String),

    /// Add units of a deal to the cart.
    AddToCart { deal: String, quantity: u32 },

    /// Change a cart line's quantity by a signed amount.
    UpdateQuantity { deal: String, delta: i64 },

    /// Remove a deal from the cart.
    RemoveItem(String),

    /// Collect the newest active order.
    ConfirmPickup,

    /// Cancel the newest active order.
    CancelOrder,

    /// Only let time pass.
    Wait,
}

/// A step of a walkthrough, run after `wait` has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Step {
    pub(crate) action: Action,
    pub(crate) wait: SignedDuration,
}

/// An ordered list of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Script {
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptFile {
    steps: Vec<StepFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepFile {
    intent: String,

    #[serde(default)]
    deal: Option<String>,

    #[serde(default)]
    screen: Option<String>,

    #[serde(default)]
    quantity: Option<i64>,

    #[serde(default)]
    wait_ms: u32,
}

impl Script {
    /// Parse a walkthrough from YAML.
    pub(crate) fn from_yaml(contents: &str) -> Result<Self, ScriptError> {
        let file: ScriptFile = serde_norway::from_str(contents)?;

        let steps = file
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                Ok(Step {
                    action: step.action(index)?,
                    wait: SignedDuration::from_millis(i64::from(step.wait_ms)),
                })
            })
            .collect::<Result<Vec<_>, ScriptError>>()?;

        Ok(Script { steps })
    }

    /// The walkthrough shipped with the binary.
    pub(crate) fn bundled() -> Result<Self, ScriptError> {
        Self::from_yaml(BUNDLED_WALKTHROUGH)
    }

    pub(crate) fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl StepFile {
    fn action(&self, step: usize) -> Result<Action, ScriptError> {
        let action = match self.intent.as_str() {
            "selectCustomer" => Action::Dispatch(Intent::SelectCustomer),
            "selectBusiness" => Action::Dispatch(Intent::SelectBusiness),
            "completeOnboarding" => Action::Dispatch(Intent::CompleteOnboarding),
            "completeSignup" => Action::Dispatch(Intent::CompleteSignup),
            "switchToLogin" => Action::Dispatch(Intent::SwitchToLogin),
            "switchToSignup" => Action::Dispatch(Intent::SwitchToSignup),
            "completeLogin" => Action::Dispatch(Intent::CompleteLogin),
            "completeLocation" => Action::Dispatch(Intent::CompleteLocation),
            "completePreferences" => Action::Dispatch(Intent::CompletePreferences),
            "completeBusinessLogin" => Action::Dispatch(Intent::CompleteBusinessLogin),
            "startBusinessSetup" => Action::Dispatch(Intent::StartBusinessSetup),
            "completeBusinessSetup" => Action::Dispatch(Intent::CompleteBusinessSetup),
            "completeCheckout" => Action::Dispatch(Intent::CompleteCheckout),
            "back" => Action::Dispatch(Intent::Back),
            "logout" => Action::Dispatch(Intent::Logout),
            "viewDeal" => Action::Dispatch(Intent::ViewDeal(self.deal(step, "viewDeal")?)),
            "reserveDeal" => Action::Dispatch(Intent::ReserveDeal(self.deal(step, "reserveDeal")?)),
            "navigate" => Action::Navigate(self.screen.clone().ok_or(ScriptError::MissingField {
                step,
                intent: "navigate",
                field: "screen",
            })?),
            "addToCart" => {
                let quantity = self.quantity.unwrap_or(1);

                Action::AddToCart {
                    deal: self.deal(step, "addToCart")?,
                    quantity: u32::try_from(quantity)
                        .map_err(|_err| ScriptError::InvalidQuantity { step, quantity })?,
                }
            }
            "updateQuantity" => Action::UpdateQuantity {
                deal: self.deal(step, "updateQuantity")?,
                delta: self.quantity.ok_or(ScriptError::MissingField {
                    step,
                    intent: "updateQuantity",
                    field: "quantity",
                })?,
            },
            "removeItem" => Action::RemoveItem(self.deal(step, "removeItem")?),
            "confirmPickup" => Action::ConfirmPickup,
            "cancelOrder" => Action::CancelOrder,
            "wait" => Action::Wait,
            _ => {
                return Err(ScriptError::UnknownIntent {
                    step,
                    intent: self.intent.clone(),
                });
            }
        };

        Ok(action)
    }

    fn deal(&self, step: usize, intent: &'static str) -> Result<String, ScriptError> {
        self.deal.clone().ok_or(ScriptError::MissingField {
            step,
            intent,
            field: "deal",
        })
    }
}
