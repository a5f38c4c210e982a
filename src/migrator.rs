use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_tiers_table::Migration),
            Box::new(m20260101_000002_create_transactions_tables::Migration),
            Box::new(m20260101_000003_create_ventes_achats_tables::Migration),
            Box::new(m20260101_000004_create_paiements_table::Migration),
            Box::new(m20260101_000005_create_echeanciers_tables::Migration),
            Box::new(m20260101_000006_create_factures_table::Migration),
            Box::new(m20260101_000007_create_document_counters_table::Migration),
        ]
    }
}

mod m20260101_000001_create_tiers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_tiers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Tiers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Tiers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Tiers::TypeTiers).string().not_null())
                        .col(ColumnDef::new(Tiers::Nom).string().not_null())
                        .col(ColumnDef::new(Tiers::Prenom).string().null())
                        .col(ColumnDef::new(Tiers::RaisonSociale).string().null())
                        .col(ColumnDef::new(Tiers::Email).string().null())
                        .col(ColumnDef::new(Tiers::Telephone).string().null())
                        .col(ColumnDef::new(Tiers::Adresse).string().null())
                        .col(ColumnDef::new(Tiers::MatriculeFiscal).string().null())
                        .col(
                            ColumnDef::new(Tiers::SoldeCourant)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Tiers::EntrepriseId).uuid().not_null())
                        .col(ColumnDef::new(Tiers::CreePar).uuid().not_null())
                        .col(
                            ColumnDef::new(Tiers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Tiers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_tiers_entreprise_type")
                        .table(Tiers::Table)
                        .col(Tiers::EntrepriseId)
                        .col(Tiers::TypeTiers)
                        .to_owned(),
                )
                .await?;

            // Tax identifier is unique within a tenant (NULLs exempt).
            manager
                .create_index(
                    Index::create()
                        .name("uq_tiers_matricule_fiscal")
                        .table(Tiers::Table)
                        .col(Tiers::EntrepriseId)
                        .col(Tiers::MatriculeFiscal)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Tiers::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Tiers {
        Table,
        Id,
        TypeTiers,
        Nom,
        Prenom,
        RaisonSociale,
        Email,
        Telephone,
        Adresse,
        MatriculeFiscal,
        SoldeCourant,
        EntrepriseId,
        CreePar,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000002_create_transactions_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_transactions_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Transactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Transactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::TypeTransaction)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::TiersId).uuid().not_null())
                        .col(
                            ColumnDef::new(Transactions::NumeroTransaction)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::DateTransaction)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::MontantTotalHt)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Transactions::MontantTotalTtc)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Transactions::MontantTaxes)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Transactions::Statut).string().not_null())
                        .col(ColumnDef::new(Transactions::Notes).string().null())
                        .col(ColumnDef::new(Transactions::EntrepriseId).uuid().not_null())
                        .col(ColumnDef::new(Transactions::CreePar).uuid().not_null())
                        .col(
                            ColumnDef::new(Transactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_transactions_numero")
                        .table(Transactions::Table)
                        .col(Transactions::EntrepriseId)
                        .col(Transactions::NumeroTransaction)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_transactions_entreprise_statut")
                        .table(Transactions::Table)
                        .col(Transactions::EntrepriseId)
                        .col(Transactions::Statut)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(LignesTransaction::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LignesTransaction::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LignesTransaction::TransactionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LignesTransaction::ArticleId).uuid().null())
                        .col(
                            ColumnDef::new(LignesTransaction::Designation)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LignesTransaction::Description)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(LignesTransaction::Quantite)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LignesTransaction::PrixUnitaireHt)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LignesTransaction::TauxTva)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(LignesTransaction::Remise)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(LignesTransaction::MontantHt)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LignesTransaction::MontantTva)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(LignesTransaction::MontantTtc)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LignesTransaction::EntrepriseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LignesTransaction::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_lignes_transaction_id")
                        .table(LignesTransaction::Table)
                        .col(LignesTransaction::TransactionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Remises::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Remises::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Remises::TransactionId).uuid().not_null())
                        .col(
                            ColumnDef::new(Remises::LigneTransactionId)
                                .uuid()
                                .null(),
                        )
                        .col(ColumnDef::new(Remises::TypeRemise).string().not_null())
                        .col(ColumnDef::new(Remises::Valeur).decimal().not_null())
                        .col(ColumnDef::new(Remises::Montant).decimal().not_null())
                        .col(ColumnDef::new(Remises::Description).string().null())
                        .col(
                            ColumnDef::new(Remises::EstGlobale)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Remises::EntrepriseId).uuid().not_null())
                        .col(
                            ColumnDef::new(Remises::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_remises_transaction_id")
                        .table(Remises::Table)
                        .col(Remises::TransactionId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Remises::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(LignesTransaction::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Transactions::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Transactions {
        Table,
        Id,
        TypeTransaction,
        TiersId,
        NumeroTransaction,
        DateTransaction,
        MontantTotalHt,
        MontantTotalTtc,
        MontantTaxes,
        Statut,
        Notes,
        EntrepriseId,
        CreePar,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum LignesTransaction {
        Table,
        Id,
        TransactionId,
        ArticleId,
        Designation,
        Description,
        Quantite,
        PrixUnitaireHt,
        TauxTva,
        Remise,
        MontantHt,
        MontantTva,
        MontantTtc,
        EntrepriseId,
        CreatedAt,
    }

    #[derive(Iden)]
    enum Remises {
        Table,
        Id,
        TransactionId,
        LigneTransactionId,
        TypeRemise,
        Valeur,
        Montant,
        Description,
        EstGlobale,
        EntrepriseId,
        CreatedAt,
    }
}

mod m20260101_000003_create_ventes_achats_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_ventes_achats_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Ventes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Ventes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Ventes::TransactionId).uuid().not_null())
                        .col(ColumnDef::new(Ventes::ClientId).uuid().not_null())
                        .col(
                            ColumnDef::new(Ventes::DateVente)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Ventes::DateEcheance)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Ventes::TypeDocument).string().not_null())
                        .col(ColumnDef::new(Ventes::NumeroDocument).string().not_null())
                        .col(ColumnDef::new(Ventes::ModePaiement).string().not_null())
                        .col(
                            ColumnDef::new(Ventes::RemiseGlobale)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Ventes::Statut).string().not_null())
                        .col(
                            ColumnDef::new(Ventes::MontantPaye)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Ventes::ResteAPayer)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Ventes::MotifAnnulation).string().null())
                        .col(
                            ColumnDef::new(Ventes::DateAnnulation)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Ventes::DocumentSource).uuid().null())
                        .col(ColumnDef::new(Ventes::NotesInternes).string().null())
                        .col(ColumnDef::new(Ventes::EntrepriseId).uuid().not_null())
                        .col(ColumnDef::new(Ventes::CreePar).uuid().not_null())
                        .col(
                            ColumnDef::new(Ventes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Ventes::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Ventes::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_ventes_transaction_id")
                        .table(Ventes::Table)
                        .col(Ventes::TransactionId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_ventes_entreprise_statut")
                        .table(Ventes::Table)
                        .col(Ventes::EntrepriseId)
                        .col(Ventes::Statut)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Achats::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Achats::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Achats::TransactionId).uuid().not_null())
                        .col(ColumnDef::new(Achats::FournisseurId).uuid().not_null())
                        .col(
                            ColumnDef::new(Achats::DateAchat)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Achats::Statut).string().not_null())
                        .col(
                            ColumnDef::new(Achats::MontantPaye)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Achats::ResteAPayer)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Achats::MotifAnnulation).string().null())
                        .col(
                            ColumnDef::new(Achats::DateAnnulation)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Achats::NotesInternes).string().null())
                        .col(ColumnDef::new(Achats::EntrepriseId).uuid().not_null())
                        .col(ColumnDef::new(Achats::CreePar).uuid().not_null())
                        .col(
                            ColumnDef::new(Achats::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Achats::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Achats::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_achats_transaction_id")
                        .table(Achats::Table)
                        .col(Achats::TransactionId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Achats::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Ventes::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Ventes {
        Table,
        Id,
        TransactionId,
        ClientId,
        DateVente,
        DateEcheance,
        TypeDocument,
        NumeroDocument,
        ModePaiement,
        RemiseGlobale,
        Statut,
        MontantPaye,
        ResteAPayer,
        MotifAnnulation,
        DateAnnulation,
        DocumentSource,
        NotesInternes,
        EntrepriseId,
        CreePar,
        CreatedAt,
        UpdatedAt,
        Version,
    }

    #[derive(Iden)]
    enum Achats {
        Table,
        Id,
        TransactionId,
        FournisseurId,
        DateAchat,
        Statut,
        MontantPaye,
        ResteAPayer,
        MotifAnnulation,
        DateAnnulation,
        NotesInternes,
        EntrepriseId,
        CreePar,
        CreatedAt,
        UpdatedAt,
        Version,
    }
}

mod m20260101_000004_create_paiements_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000004_create_paiements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Paiements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Paiements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Paiements::TransactionId).uuid().not_null())
                        .col(ColumnDef::new(Paiements::TypePaiement).string().not_null())
                        .col(ColumnDef::new(Paiements::Montant).decimal().not_null())
                        .col(
                            ColumnDef::new(Paiements::DatePaiement)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Paiements::Reference).string().null())
                        .col(ColumnDef::new(Paiements::Banque).string().null())
                        .col(ColumnDef::new(Paiements::Statut).string().not_null())
                        .col(
                            ColumnDef::new(Paiements::DateStatut)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Paiements::NotesPaiement).string().null())
                        .col(ColumnDef::new(Paiements::EntrepriseId).uuid().not_null())
                        .col(ColumnDef::new(Paiements::CreePar).uuid().not_null())
                        .col(
                            ColumnDef::new(Paiements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_paiements_transaction_id")
                        .table(Paiements::Table)
                        .col(Paiements::TransactionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_paiements_entreprise_statut")
                        .table(Paiements::Table)
                        .col(Paiements::EntrepriseId)
                        .col(Paiements::Statut)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Paiements::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Paiements {
        Table,
        Id,
        TransactionId,
        TypePaiement,
        Montant,
        DatePaiement,
        Reference,
        Banque,
        Statut,
        DateStatut,
        NotesPaiement,
        EntrepriseId,
        CreePar,
        CreatedAt,
    }
}

mod m20260101_000005_create_echeanciers_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000005_create_echeanciers_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Echeanciers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Echeanciers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Echeanciers::TransactionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Echeanciers::VenteId).uuid().null())
                        .col(
                            ColumnDef::new(Echeanciers::MontantTotal)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Echeanciers::NombreEcheances)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Echeanciers::Statut).string().not_null())
                        .col(
                            ColumnDef::new(Echeanciers::NotesEcheancier)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Echeanciers::EntrepriseId).uuid().not_null())
                        .col(ColumnDef::new(Echeanciers::CreePar).uuid().not_null())
                        .col(
                            ColumnDef::new(Echeanciers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Echeanciers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_echeanciers_transaction_id")
                        .table(Echeanciers::Table)
                        .col(Echeanciers::TransactionId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Echeances::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Echeances::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Echeances::TransactionId).uuid().not_null())
                        .col(ColumnDef::new(Echeances::EcheancierId).uuid().not_null())
                        .col(
                            ColumnDef::new(Echeances::DateEcheance)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Echeances::Montant).decimal().not_null())
                        .col(ColumnDef::new(Echeances::TypePaiement).string().not_null())
                        .col(ColumnDef::new(Echeances::Reference).string().null())
                        .col(ColumnDef::new(Echeances::Banque).string().null())
                        .col(ColumnDef::new(Echeances::Statut).string().not_null())
                        .col(
                            ColumnDef::new(Echeances::DateEncaissement)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Echeances::Notes).string().null())
                        .col(ColumnDef::new(Echeances::EntrepriseId).uuid().not_null())
                        .col(
                            ColumnDef::new(Echeances::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Echeances::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_echeances_transaction_id")
                        .table(Echeances::Table)
                        .col(Echeances::TransactionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_echeances_echeancier_id")
                        .table(Echeances::Table)
                        .col(Echeances::EcheancierId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_echeances_date")
                        .table(Echeances::Table)
                        .col(Echeances::DateEcheance)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Echeances::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Echeanciers::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Echeanciers {
        Table,
        Id,
        TransactionId,
        VenteId,
        MontantTotal,
        NombreEcheances,
        Statut,
        NotesEcheancier,
        EntrepriseId,
        CreePar,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum Echeances {
        Table,
        Id,
        TransactionId,
        EcheancierId,
        DateEcheance,
        Montant,
        TypePaiement,
        Reference,
        Banque,
        Statut,
        DateEncaissement,
        Notes,
        EntrepriseId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000006_create_factures_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000006_create_factures_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Factures::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Factures::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Factures::TransactionId).uuid().not_null())
                        .col(ColumnDef::new(Factures::VenteId).uuid().not_null())
                        .col(ColumnDef::new(Factures::NumeroFacture).string().not_null())
                        .col(
                            ColumnDef::new(Factures::DateFacture)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Factures::DateEcheance)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Factures::Statut).string().not_null())
                        .col(ColumnDef::new(Factures::UrlFichier).string().null())
                        .col(
                            ColumnDef::new(Factures::Envoye)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Factures::DateEnvoi)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Factures::DestinataireEmail)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Factures::EntrepriseId).uuid().not_null())
                        .col(ColumnDef::new(Factures::CreePar).uuid().not_null())
                        .col(
                            ColumnDef::new(Factures::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Factures::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_factures_vente_id")
                        .table(Factures::Table)
                        .col(Factures::VenteId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_factures_numero")
                        .table(Factures::Table)
                        .col(Factures::EntrepriseId)
                        .col(Factures::NumeroFacture)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Factures::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Factures {
        Table,
        Id,
        TransactionId,
        VenteId,
        NumeroFacture,
        DateFacture,
        DateEcheance,
        Statut,
        UrlFichier,
        Envoye,
        DateEnvoi,
        DestinataireEmail,
        EntrepriseId,
        CreePar,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000007_create_document_counters_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000007_create_document_counters_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DocumentCounters::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DocumentCounters::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentCounters::EntrepriseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentCounters::DocType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DocumentCounters::Year).integer().not_null())
                        .col(
                            ColumnDef::new(DocumentCounters::Month)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentCounters::Sequence)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DocumentCounters::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentCounters::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One counter per document type and month within a tenant.
            manager
                .create_index(
                    Index::create()
                        .name("uq_document_counters_key")
                        .table(DocumentCounters::Table)
                        .col(DocumentCounters::EntrepriseId)
                        .col(DocumentCounters::DocType)
                        .col(DocumentCounters::Year)
                        .col(DocumentCounters::Month)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DocumentCounters::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum DocumentCounters {
        Table,
        Id,
        EntrepriseId,
        DocType,
        Year,
        Month,
        Sequence,
        CreatedAt,
        UpdatedAt,
    }
}
