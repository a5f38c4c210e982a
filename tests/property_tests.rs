//! Property-based tests for the monetary core.
//!
//! These use proptest to verify invariants across a wide range of inputs,
//! catching edge cases that example-based tests miss.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use gescom_api::entities::echeance::TypeEcheance;
use gescom_api::entities::remise::TypeRemise;
use gescom_api::entities::vente::StatutVente;
use gescom_api::services::echeancier::{generer_echeances_equitables, Intervalle};
use gescom_api::services::montants::{self, Totaux};
use gescom_api::services::reconciliation;

fn montant_strategy() -> impl Strategy<Value = Decimal> {
    // 0.01 .. 1_000_000.00, two decimal places
    (1i64..100_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn start_date() -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339("2026-03-01T00:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // The generator's hard invariant: amounts sum to the target exactly,
    // whatever the amount and count.
    #[test]
    fn generated_schedule_sums_exactly(
        montant in montant_strategy(),
        nombre in 1i32..48,
    ) {
        let echeances = generer_echeances_equitables(
            montant,
            nombre,
            start_date(),
            Intervalle::Jours(30),
            TypeEcheance::Cheque,
            None,
        )
        .unwrap();

        prop_assert_eq!(echeances.len(), nombre as usize);
        let somme: Decimal = echeances.iter().map(|e| e.montant).sum();
        prop_assert_eq!(somme, montant);

        // All but the last are equal and integer-floored
        if nombre > 1 {
            let premier = echeances[0].montant;
            prop_assert!(echeances[..nombre as usize - 1]
                .iter()
                .all(|e| e.montant == premier));
            prop_assert_eq!(premier, premier.floor());
        }
    }

    // Due dates strictly increase and the first one is offset.
    #[test]
    fn generated_schedule_dates_increase(
        montant in montant_strategy(),
        nombre in 1i32..24,
        jours in 1i64..90,
    ) {
        let echeances = generer_echeances_equitables(
            montant,
            nombre,
            start_date(),
            Intervalle::Jours(jours),
            TypeEcheance::Effet,
            None,
        )
        .unwrap();

        prop_assert!(echeances[0].date_echeance > start_date());
        for fenetre in echeances.windows(2) {
            prop_assert!(fenetre[0].date_echeance < fenetre[1].date_echeance);
        }
    }

    // A zero-percent discount never changes the totals.
    #[test]
    fn zero_discount_is_identity(ht in montant_strategy(), taux in 0u32..30) {
        let taxes = montants::round2(ht * Decimal::from(taux) / dec!(100));
        let totaux = Totaux {
            montant_ht: ht,
            montant_taxes: taxes,
            montant_ttc: ht + taxes,
        };
        let (scaled, montant) =
            montants::apply_remise_globale(totaux, TypeRemise::Pourcentage, Decimal::ZERO)
                .unwrap();
        prop_assert_eq!(scaled, totaux);
        prop_assert_eq!(montant, Decimal::ZERO);
    }

    // After any valid percentage discount the three totals stay consistent.
    #[test]
    fn discounted_totals_stay_consistent(
        ht in montant_strategy(),
        taux in 0u32..30,
        remise in 1u32..100,
    ) {
        let taxes = montants::round2(ht * Decimal::from(taux) / dec!(100));
        let totaux = Totaux {
            montant_ht: ht,
            montant_taxes: taxes,
            montant_ttc: ht + taxes,
        };
        let (scaled, _) = montants::apply_remise_globale(
            totaux,
            TypeRemise::Pourcentage,
            Decimal::from(remise),
        )
        .unwrap();
        prop_assert_eq!(scaled.montant_ttc, scaled.montant_ht + scaled.montant_taxes);
        prop_assert!(scaled.montant_ht <= totaux.montant_ht);
    }

    // Status derivation is total and consistent with the amounts.
    #[test]
    fn derive_statut_is_consistent(total in montant_strategy(), paye in montant_strategy()) {
        let statut = reconciliation::derive_statut(StatutVente::Validee, total, paye);
        if total - paye < dec!(0.01) {
            prop_assert_eq!(statut, StatutVente::Payee);
        } else if paye > Decimal::ZERO {
            prop_assert_eq!(statut, StatutVente::PartiellementPayee);
        } else {
            prop_assert_eq!(statut, StatutVente::Validee);
        }
    }

    // A cancelled sale never leaves ANNULEE, whatever the amounts say.
    #[test]
    fn annulee_is_absorbing(total in montant_strategy(), paye in montant_strategy()) {
        let statut = reconciliation::derive_statut(StatutVente::Annulee, total, paye);
        prop_assert_eq!(statut, StatutVente::Annulee);
    }
}
