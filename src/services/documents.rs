//! Document rendering and mail delivery collaborators.
//!
//! Both are external systems from the workflow's point of view: the core
//! builds a normalized projection of the transaction and hands it to a
//! `DocumentRenderer`; delivery goes through a `MailTransport`. The default
//! implementations render a deterministic plain-text layout and log the
//! delivery, which is enough for tests and for environments without a PDF
//! engine or SMTP relay.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::vente::TypeDocument;
use crate::errors::ServiceError;

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EntrepriseInfo {
    pub nom: String,
    pub adresse: Option<String>,
    pub telephone: Option<String>,
    pub email: Option<String>,
    pub matricule_fiscal: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientInfo {
    pub nom: String,
    pub prenom: Option<String>,
    pub raison_sociale: Option<String>,
    pub adresse: Option<String>,
    pub telephone: Option<String>,
    pub email: Option<String>,
    pub matricule_fiscal: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LigneProjection {
    pub designation: String,
    pub quantite: Decimal,
    pub prix_unitaire_ht: Decimal,
    pub taux_tva: Decimal,
    pub remise: Decimal,
    pub montant_ht: Decimal,
    pub montant_ttc: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RemiseProjection {
    pub type_remise: String,
    pub valeur: Decimal,
    pub montant: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EcheanceProjection {
    pub date_echeance: DateTime<Utc>,
    pub montant: Decimal,
    pub type_paiement: String,
    pub reference: Option<String>,
    pub statut: String,
}

/// Normalized data shape handed to the renderer: one canonical projection
/// built at the persistence boundary, never re-derived from ad-hoc shapes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FactureProjection {
    pub numero_facture: String,
    pub date_facture: DateTime<Utc>,
    pub statut: String,
    pub entreprise: EntrepriseInfo,
    pub client: ClientInfo,
    pub lignes: Vec<LigneProjection>,
    pub remise_globale: Option<RemiseProjection>,
    pub montant_total_ht: Decimal,
    pub montant_taxes: Decimal,
    pub montant_total_ttc: Decimal,
    pub montant_paye: Decimal,
    pub reste_a_payer: Decimal,
    pub echeances: Vec<EcheanceProjection>,
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Produces the document binary for the given projection.
    async fn render(
        &self,
        projection: &FactureProjection,
        type_document: TypeDocument,
    ) -> Result<Vec<u8>, ServiceError>;
}

fn type_document_titre(type_document: TypeDocument) -> &'static str {
    match type_document {
        TypeDocument::Facture => "FACTURE",
        TypeDocument::BonLivraison => "BON DE LIVRAISON",
        TypeDocument::FactureProforma => "DEVIS",
        TypeDocument::Avoir => "AVOIR",
    }
}

/// Plain-text renderer used by default. Layout follows the PDF produced by
/// the document service: company block, client block, line table, totals,
/// then the installment schedule when present.
#[derive(Debug, Clone, Default)]
pub struct TextDocumentRenderer;

#[async_trait]
impl DocumentRenderer for TextDocumentRenderer {
    async fn render(
        &self,
        projection: &FactureProjection,
        type_document: TypeDocument,
    ) -> Result<Vec<u8>, ServiceError> {
        let mut out = String::new();

        out.push_str(&format!("{}\n", projection.entreprise.nom));
        if let Some(adresse) = &projection.entreprise.adresse {
            out.push_str(&format!("{adresse}\n"));
        }
        if let Some(matricule) = &projection.entreprise.matricule_fiscal {
            out.push_str(&format!("Matricule fiscal: {matricule}\n"));
        }
        out.push('\n');

        out.push_str("Client\n");
        out.push_str(&format!(
            "{} {}\n",
            projection.client.nom,
            projection.client.prenom.as_deref().unwrap_or("")
        ));
        if let Some(raison_sociale) = &projection.client.raison_sociale {
            out.push_str(&format!("{raison_sociale}\n"));
        }
        if let Some(adresse) = &projection.client.adresse {
            out.push_str(&format!("{adresse}\n"));
        }
        out.push('\n');

        out.push_str(&format!(
            "{} N° {}\n",
            type_document_titre(type_document),
            projection.numero_facture
        ));
        out.push_str(&format!(
            "Date: {}\n\n",
            projection.date_facture.format("%d/%m/%Y")
        ));

        out.push_str(&format!(
            "{:<40} {:>10} {:>12} {:>12}\n",
            "Description", "Quantité", "PU HT", "Total HT"
        ));
        for ligne in &projection.lignes {
            out.push_str(&format!(
                "{:<40} {:>10} {:>9.2} TND {:>9.2} TND\n",
                ligne.designation, ligne.quantite, ligne.prix_unitaire_ht, ligne.montant_ht
            ));
        }
        out.push('\n');

        out.push_str(&format!(
            "{:>60} {:>9.2} TND\n",
            "Total HT:", projection.montant_total_ht
        ));
        if let Some(remise) = &projection.remise_globale {
            out.push_str(&format!(
                "{:>60} {:>9.2} TND\n",
                format!("Remise ({}):", remise.valeur),
                remise.montant
            ));
        }
        out.push_str(&format!(
            "{:>60} {:>9.2} TND\n",
            "TVA:", projection.montant_taxes
        ));
        out.push_str(&format!(
            "{:>60} {:>9.2} TND\n",
            "Total TTC:", projection.montant_total_ttc
        ));
        out.push_str(&format!(
            "{:>60} {:>9.2} TND\n",
            "Reste à payer:", projection.reste_a_payer
        ));

        if !projection.echeances.is_empty() {
            out.push_str("\nÉchéancier\n");
            for echeance in &projection.echeances {
                out.push_str(&format!(
                    "{} {:>9.2} TND {} {}\n",
                    echeance.date_echeance.format("%d/%m/%Y"),
                    echeance.montant,
                    echeance.type_paiement,
                    echeance.reference.as_deref().unwrap_or("-")
                ));
            }
        }

        Ok(out.into_bytes())
    }
}

// ---------------------------------------------------------------------------
// Mail transport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailAttachment {
    pub filename: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(skip)]
    pub attachments: Vec<MailAttachment>,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Sends the message and returns a delivery id.
    async fn send(&self, message: MailMessage) -> Result<String, ServiceError>;
}

/// Default transport: logs the delivery instead of speaking SMTP. The
/// message id it returns is stable enough for the envoi history.
#[derive(Debug, Clone, Default)]
pub struct LoggingMailTransport;

#[async_trait]
impl MailTransport for LoggingMailTransport {
    async fn send(&self, message: MailMessage) -> Result<String, ServiceError> {
        let message_id = format!("local-{}", Uuid::new_v4());
        info!(
            to = %message.to,
            subject = %message.subject,
            attachments = message.attachments.len(),
            message_id = %message_id,
            "mail delivery (logging transport)"
        );
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn projection() -> FactureProjection {
        FactureProjection {
            numero_facture: "FACT-202608-0001".into(),
            date_facture: Utc::now(),
            statut: "VALIDEE".into(),
            entreprise: EntrepriseInfo {
                nom: "Société Test".into(),
                adresse: Some("Tunis".into()),
                telephone: None,
                email: None,
                matricule_fiscal: Some("1234567A".into()),
            },
            client: ClientInfo {
                nom: "Ben Salah".into(),
                prenom: Some("Ali".into()),
                raison_sociale: None,
                adresse: None,
                telephone: None,
                email: Some("ali@example.tn".into()),
                matricule_fiscal: None,
            },
            lignes: vec![LigneProjection {
                designation: "Prestation".into(),
                quantite: dec!(2),
                prix_unitaire_ht: dec!(50),
                taux_tva: dec!(19),
                remise: Decimal::ZERO,
                montant_ht: dec!(100),
                montant_ttc: dec!(119),
            }],
            remise_globale: None,
            montant_total_ht: dec!(100),
            montant_taxes: dec!(19),
            montant_total_ttc: dec!(119),
            montant_paye: Decimal::ZERO,
            reste_a_payer: dec!(119),
            echeances: vec![],
        }
    }

    #[tokio::test]
    async fn text_renderer_includes_key_amounts() {
        let bytes = TextDocumentRenderer
            .render(&projection(), TypeDocument::Facture)
            .await
            .unwrap();
        let texte = String::from_utf8(bytes).unwrap();

        assert!(texte.contains("FACTURE N° FACT-202608-0001"));
        assert!(texte.contains("Société Test"));
        assert!(texte.contains("Ben Salah"));
        assert!(texte.contains("Total TTC:"));
        assert!(texte.contains("119"));
    }

    #[tokio::test]
    async fn logging_transport_returns_message_id() {
        let id = LoggingMailTransport
            .send(MailMessage {
                to: "client@example.tn".into(),
                subject: "Facture".into(),
                body: "Veuillez trouver ci-joint votre facture.".into(),
                attachments: vec![],
            })
            .await
            .unwrap();
        assert!(id.starts_with("local-"));
    }
}
