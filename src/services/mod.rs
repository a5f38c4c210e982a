pub mod achats;
pub mod documents;
pub mod echeancier;
pub mod facturation;
pub mod montants;
pub mod numerotation;
pub mod paiements;
pub mod reconciliation;
pub mod tiers;
pub mod ventes;
