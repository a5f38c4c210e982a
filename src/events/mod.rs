use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// The events that can occur across the sale/purchase workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Sale workflow events
    VenteInitiee(Uuid),
    LignesDefinies {
        vente_id: Uuid,
        nombre_lignes: usize,
        montant_total_ttc: Decimal,
    },
    ModePaiementDefini {
        vente_id: Uuid,
        mode_paiement: String,
    },
    EcheancierCree {
        vente_id: Uuid,
        nombre_echeances: i32,
        montant_total: Decimal,
    },
    VenteValidee {
        vente_id: Uuid,
        statut: String,
    },
    VenteAnnulee(Uuid),
    VenteTransformee {
        source_id: Uuid,
        cible_id: Uuid,
    },

    // Payment events
    PaiementEnregistre {
        transaction_id: Uuid,
        montant: Decimal,
    },
    EcheanceMiseAJour {
        echeance_id: Uuid,
        statut: String,
    },
    EcheancierTermine(Uuid),

    // Purchase events
    AchatCree(Uuid),
    AchatAnnule(Uuid),

    // Document events
    FactureGeneree {
        facture_id: Uuid,
        numero_facture: String,
    },
    FactureEnvoyee {
        facture_id: Uuid,
        destinataire: String,
    },
    TiersCree(Uuid),

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

/// Background task draining the event channel.
///
/// Events are currently logged; downstream consumers (notifications,
/// exports) subscribe here without touching the workflow code.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(event = %payload, "domain event"),
            Err(e) => warn!(error = %e, ?event, "failed to serialize event"),
        }
    }
    info!("event channel closed, stopping event processor");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn sender_delivers_events() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        sender
            .send(Event::PaiementEnregistre {
                transaction_id: Uuid::nil(),
                montant: dec!(100),
            })
            .await
            .unwrap();

        match rx.recv().await {
            Some(Event::PaiementEnregistre { montant, .. }) => assert_eq!(montant, dec!(100)),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::VenteInitiee(Uuid::nil())).await.is_err());
    }
}
