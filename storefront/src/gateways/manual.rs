use super::{PaymentAction, PaymentOutcome};
use crate::models::ManualConfig;

pub const DEFAULT_INSTRUCTIONS: &str =
  "Silakan selesaikan pembayaran melalui QRIS dan kirim bukti pembayaran ke email kami.";

/// Manual QRIS: static instructions, no external call, no reference.
pub fn payment_action(cfg: &ManualConfig) -> PaymentOutcome {
  let instructions = super::non_empty(cfg.instructions.as_deref())
    .unwrap_or(DEFAULT_INSTRUCTIONS)
    .to_string();
  PaymentOutcome::action_only(PaymentAction::Manual {
    instructions,
    qr_image_url: super::non_empty(cfg.qr_image_url.as_deref()).map(str::to_string),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_config_falls_back_to_default_instructions() {
    let outcome = payment_action(&ManualConfig::default());
    assert_eq!(
      outcome.action,
      Some(PaymentAction::Manual {
        instructions: DEFAULT_INSTRUCTIONS.to_string(),
        qr_image_url: None,
      })
    );
    assert!(!outcome.has_reference());
  }

  #[test]
  fn configured_instructions_are_used() {
    let cfg = ManualConfig {
      instructions: Some("Transfer ke BCA".to_string()),
      qr_image_url: Some("https://cdn.example/qr.png".to_string()),
    };
    match payment_action(&cfg).action {
      Some(PaymentAction::Manual { instructions, qr_image_url }) => {
        assert_eq!(instructions, "Transfer ke BCA");
        assert_eq!(qr_image_url.as_deref(), Some("https://cdn.example/qr.png"));
      }
      other => panic!("unexpected action {:?}", other),
    }
  }
}
