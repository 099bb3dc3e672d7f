//! Stripe, Midtrans and Xendit checkout stubs: redirect to a configured URL.

use super::{PaymentAction, PaymentOutcome};

pub fn payment_action(payment_action_url: Option<&str>) -> PaymentOutcome {
  let url = super::non_empty(payment_action_url).unwrap_or("#").to_string();
  PaymentOutcome::action_only(PaymentAction::Redirect { url })
}
