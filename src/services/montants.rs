//! Monetary calculation utilities.
//!
//! Pure functions over `Decimal`. Line amounts stay unrounded; rounding
//! happens once at the aggregate level to avoid cumulative drift across
//! lines. The 0.01 tolerance used for payment and schedule comparisons
//! lives here so every caller agrees on it.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::entities::remise::TypeRemise;
use crate::errors::ServiceError;

/// Rounding tolerance for monetary comparisons.
pub fn tolerance() -> Decimal {
    dec!(0.01)
}

/// Rounds to cent precision, midpoint away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// True when the two amounts differ by less than the 0.01 tolerance.
pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < tolerance()
}

/// Raw (unrounded) amounts for a single transaction line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LigneTotaux {
    pub montant_ht: Decimal,
    pub montant_tva: Decimal,
    pub montant_ttc: Decimal,
}

/// Rounded aggregate totals for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totaux {
    pub montant_ht: Decimal,
    pub montant_taxes: Decimal,
    pub montant_ttc: Decimal,
}

impl Totaux {
    pub fn zero() -> Self {
        Self {
            montant_ht: Decimal::ZERO,
            montant_taxes: Decimal::ZERO,
            montant_ttc: Decimal::ZERO,
        }
    }
}

/// Computes raw line amounts.
///
/// montant_ht = quantite x prix_unitaire_ht x (1 - remise/100)
/// montant_ttc = montant_ht x (1 + taux_tva/100)
pub fn ligne_totaux(
    quantite: Decimal,
    prix_unitaire_ht: Decimal,
    remise_pct: Decimal,
    taux_tva: Decimal,
) -> LigneTotaux {
    let cent = dec!(100);
    let montant_ht = quantite * prix_unitaire_ht * (Decimal::ONE - remise_pct / cent);
    let montant_tva = montant_ht * taux_tva / cent;
    LigneTotaux {
        montant_ht,
        montant_tva,
        montant_ttc: montant_ht + montant_tva,
    }
}

/// Sums raw line amounts and rounds the aggregates.
///
/// `montant_taxes` is recomputed as `ttc - ht` after rounding so the three
/// totals stay mutually consistent.
pub fn totaux(lignes: &[LigneTotaux]) -> Totaux {
    let ht: Decimal = lignes.iter().map(|l| l.montant_ht).sum();
    let ttc: Decimal = lignes.iter().map(|l| l.montant_ttc).sum();
    let montant_ht = round2(ht);
    let montant_ttc = round2(ttc);
    Totaux {
        montant_ht,
        montant_taxes: montant_ttc - montant_ht,
        montant_ttc,
    }
}

/// Monetary amount of a global discount against a subtotal.
pub fn montant_remise_globale(total_ht: Decimal, type_remise: TypeRemise, valeur: Decimal) -> Decimal {
    match type_remise {
        TypeRemise::Pourcentage => round2(total_ht * valeur / dec!(100)),
        TypeRemise::MontantFixe => valeur,
    }
}

/// Applies a global discount by scaling the three totals with the same
/// factor `1 - montant/ht`, keeping `ttc = ht + taxes`.
///
/// A zero subtotal makes the factor undefined and is rejected instead of
/// silently propagating NaN totals; a discount exceeding the subtotal is
/// rejected for the same reason.
pub fn apply_remise_globale(
    totaux: Totaux,
    type_remise: TypeRemise,
    valeur: Decimal,
) -> Result<(Totaux, Decimal), ServiceError> {
    if valeur < Decimal::ZERO {
        return Err(ServiceError::InvalidDiscount(format!(
            "valeur négative: {valeur}"
        )));
    }
    if valeur.is_zero() {
        return Ok((totaux, Decimal::ZERO));
    }
    if totaux.montant_ht.is_zero() {
        return Err(ServiceError::InvalidDiscount(
            "remise globale sur un total HT nul".into(),
        ));
    }

    let montant = montant_remise_globale(totaux.montant_ht, type_remise, valeur);
    if montant > totaux.montant_ht {
        return Err(ServiceError::InvalidDiscount(format!(
            "remise {montant} supérieure au total HT {}",
            totaux.montant_ht
        )));
    }

    let facteur = Decimal::ONE - montant / totaux.montant_ht;
    let montant_ht = round2(totaux.montant_ht * facteur);
    let montant_ttc = round2(totaux.montant_ttc * facteur);
    Ok((
        Totaux {
            montant_ht,
            montant_taxes: montant_ttc - montant_ht,
            montant_ttc,
        },
        montant,
    ))
}
