use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_sequences_user_id")
                    .table(Sequences::Table)
                    .col(Sequences::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_analysis_results_sequence_id")
                    .table(AnalysisResults::Table)
                    .col(AnalysisResults::SequenceId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reports_sequence_id")
                    .table(Reports::Table)
                    .col(Reports::SequenceId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // History listing filters on user then sorts by date
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_log_user_created_at")
                    .table(ActivityLog::Table)
                    .col(ActivityLog::UserId)
                    .col(ActivityLog::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_activity_log_user_created_at")
                    .table(ActivityLog::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_reports_sequence_id")
                    .table(Reports::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_analysis_results_sequence_id")
                    .table(AnalysisResults::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_sequences_user_id")
                    .table(Sequences::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum Sequences {
    Table,
    UserId,
}

#[derive(Iden)]
enum AnalysisResults {
    Table,
    SequenceId,
}

#[derive(Iden)]
enum Reports {
    Table,
    SequenceId,
}

#[derive(Iden)]
enum ActivityLog {
    Table,
    UserId,
    CreatedAt,
}
