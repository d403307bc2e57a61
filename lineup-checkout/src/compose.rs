use lineup_core::payment::{MethodSelection, PaymentMethodRequest, PaymentRequest};
use lineup_shared::money::Money;

/// Turns the user's funding selections into a wire payment request.
///
/// Pure and deterministic. A season-ticket pass redeems the session on its
/// own. Otherwise fixed-value sources are applied in a stable order —
/// certificate, then loyalty balance — each clamped so the running total
/// never exceeds the price, and a card instrument is appended for whatever
/// remains. A source clamped to zero is dropped rather than sent as an
/// empty method.
pub fn compose(selection: &MethodSelection, price: &Money) -> PaymentRequest {
    if let Some(pass_id) = selection.season_pass {
        return PaymentRequest::Single(PaymentMethodRequest::SeasonPass { id: pass_id });
    }

    let mut methods = Vec::new();
    let mut remaining = price.amount_minor;

    if let Some(certificate) = &selection.certificate {
        let applied = certificate.balance.amount_minor.min(remaining).max(0);
        if applied > 0 {
            methods.push(PaymentMethodRequest::Certificate {
                id: certificate.id.as_inner().clone(),
                amount: price.with_amount(applied),
            });
            remaining -= applied;
        }
    }

    if let Some(loyalty) = &selection.loyalty {
        let applied = loyalty.amount_minor.min(remaining).max(0);
        if applied > 0 {
            methods.push(PaymentMethodRequest::LoyaltyBalance {
                amount: price.with_amount(applied),
            });
            remaining -= applied;
        }
    }

    // No selection at all still charges the card; the host dialog collects
    // the instrument.
    if remaining > 0 || methods.is_empty() {
        methods.push(PaymentMethodRequest::Card);
    }

    if methods.len() == 1 {
        PaymentRequest::Single(methods.remove(0))
    } else {
        PaymentRequest::Composite(methods)
    }
}
