//! Sequential document numbering.
//!
//! One counter row per (tenant, document type, month). Counters are read
//! and bumped inside the caller's database transaction, so a failed
//! workflow step never burns a number.

use chrono::{Datelike, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::document_counter::{self, Entity as CounterEntity};
use crate::entities::transaction::TypeTransaction;
use crate::entities::vente::TypeDocument;
use crate::errors::ServiceError;

/// Everything that receives a sequential business number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePiece {
    /// Transaction numbers: `V-2608-0001` / `A-2608-0001`
    Transaction(TypeTransaction),
    /// Sale document numbers: `F-` / `BL-` / `DP-` / `AV-202608-0001`
    Document(TypeDocument),
    /// Invoice numbers: `FACT-202608-0001`
    Facture,
}

impl TypePiece {
    fn counter_key(&self) -> &'static str {
        match self {
            TypePiece::Transaction(TypeTransaction::Vente) => "TRANSACTION_VENTE",
            TypePiece::Transaction(TypeTransaction::Achat) => "TRANSACTION_ACHAT",
            TypePiece::Document(TypeDocument::Facture) => "DOC_FACTURE",
            TypePiece::Document(TypeDocument::BonLivraison) => "DOC_BON_LIVRAISON",
            TypePiece::Document(TypeDocument::FactureProforma) => "DOC_FACTURE_PROFORMA",
            TypePiece::Document(TypeDocument::Avoir) => "DOC_AVOIR",
            TypePiece::Facture => "FACTURE",
        }
    }

    fn format(&self, year: i32, month: u32, sequence: i32) -> String {
        match self {
            TypePiece::Transaction(type_transaction) => {
                let prefix = match type_transaction {
                    TypeTransaction::Vente => "V",
                    TypeTransaction::Achat => "A",
                };
                format!("{}-{:02}{:02}-{:04}", prefix, year % 100, month, sequence)
            }
            TypePiece::Document(type_document) => {
                let prefix = match type_document {
                    TypeDocument::Facture => "F",
                    TypeDocument::BonLivraison => "BL",
                    TypeDocument::FactureProforma => "DP",
                    TypeDocument::Avoir => "AV",
                };
                format!("{}-{}{:02}-{:04}", prefix, year, month, sequence)
            }
            TypePiece::Facture => format!("FACT-{}{:02}-{:04}", year, month, sequence),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NumerotationService;

impl NumerotationService {
    pub fn new() -> Self {
        Self
    }

    /// Allocates the next number for the given piece type and tenant.
    ///
    /// Must be called with the enclosing workflow transaction so the bump
    /// commits (or rolls back) together with the numbered entity.
    #[instrument(skip(self, db), fields(type_piece = ?type_piece, entreprise_id = %entreprise_id))]
    pub async fn next_number<C: ConnectionTrait>(
        &self,
        db: &C,
        type_piece: TypePiece,
        entreprise_id: Uuid,
    ) -> Result<String, ServiceError> {
        let now = Utc::now();
        let year = now.year();
        let month = now.month();

        let existing = CounterEntity::find()
            .filter(document_counter::Column::EntrepriseId.eq(entreprise_id))
            .filter(document_counter::Column::DocType.eq(type_piece.counter_key()))
            .filter(document_counter::Column::Year.eq(year))
            .filter(document_counter::Column::Month.eq(month as i32))
            .one(db)
            .await
            .map_err(ServiceError::from_db)?;

        let sequence = match existing {
            Some(counter) => {
                let next = counter.sequence + 1;
                let mut active: document_counter::ActiveModel = counter.into();
                active.sequence = Set(next);
                active.update(db).await.map_err(ServiceError::from_db)?;
                next
            }
            None => {
                let active = document_counter::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    entreprise_id: Set(entreprise_id),
                    doc_type: Set(type_piece.counter_key().to_string()),
                    year: Set(year),
                    month: Set(month as i32),
                    sequence: Set(1),
                    ..Default::default()
                };
                active.insert(db).await.map_err(ServiceError::from_db)?;
                1
            }
        };

        Ok(type_piece.format(year, month, sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_numbers_use_short_year() {
        let numero = TypePiece::Transaction(TypeTransaction::Vente).format(2026, 8, 12);
        assert_eq!(numero, "V-2608-0012");
        let numero = TypePiece::Transaction(TypeTransaction::Achat).format(2026, 8, 3);
        assert_eq!(numero, "A-2608-0003");
    }

    #[test]
    fn document_numbers_use_full_year() {
        assert_eq!(
            TypePiece::Document(TypeDocument::Facture).format(2026, 8, 1),
            "F-202608-0001"
        );
        assert_eq!(
            TypePiece::Document(TypeDocument::BonLivraison).format(2026, 8, 2),
            "BL-202608-0002"
        );
        assert_eq!(
            TypePiece::Document(TypeDocument::FactureProforma).format(2026, 12, 45),
            "DP-202612-0045"
        );
        assert_eq!(TypePiece::Facture.format(2026, 8, 7), "FACT-202608-0007");
    }

    #[test]
    fn counter_keys_are_distinct() {
        let keys = [
            TypePiece::Transaction(TypeTransaction::Vente).counter_key(),
            TypePiece::Transaction(TypeTransaction::Achat).counter_key(),
            TypePiece::Document(TypeDocument::Facture).counter_key(),
            TypePiece::Document(TypeDocument::BonLivraison).counter_key(),
            TypePiece::Document(TypeDocument::FactureProforma).counter_key(),
            TypePiece::Document(TypeDocument::Avoir).counter_key(),
            TypePiece::Facture.counter_key(),
        ];
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }
}
