use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    Username,
    AvatarUrl,
    TimeBalance,
    XpPoints,
    Level,
    StreakDays,
    LastActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Missions {
    Table,
    Id,
    Title,
    Description,
    MissionType,
    TimeReward,
    XpReward,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum UserMissions {
    Table,
    Id,
    UserId,
    MissionId,
    CompletedAt,
}

#[derive(DeriveIden)]
enum QuestionsOfTheDay {
    Table,
    Id,
    Question,
    ActiveDate,
    CreatedAt,
}

#[derive(DeriveIden)]
enum UserResponses {
    Table,
    Id,
    UserId,
    QuestionId,
    Response,
    SentencesCount,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profiles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Profiles::Username).string().not_null())
                    .col(ColumnDef::new(Profiles::AvatarUrl).string().null())
                    .col(
                        ColumnDef::new(Profiles::TimeBalance)
                            .big_integer()
                            .not_null()
                            .default(336),
                    )
                    .col(
                        ColumnDef::new(Profiles::XpPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Profiles::Level).integer().not_null().default(1))
                    .col(
                        ColumnDef::new(Profiles::StreakDays)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Profiles::LastActive)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Profiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Profiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_profiles_xp_points")
                    .table(Profiles::Table)
                    .col(Profiles::XpPoints)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Missions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Missions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Missions::Title).string().not_null())
                    .col(ColumnDef::new(Missions::Description).text().null())
                    .col(ColumnDef::new(Missions::MissionType).string().not_null())
                    .col(
                        ColumnDef::new(Missions::TimeReward)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Missions::XpReward)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Missions::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Missions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserMissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserMissions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserMissions::UserId).uuid().not_null())
                    .col(ColumnDef::new(UserMissions::MissionId).uuid().not_null())
                    .col(
                        ColumnDef::new(UserMissions::CompletedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_missions_mission")
                            .from(UserMissions::Table, UserMissions::MissionId)
                            .to(Missions::Table, Missions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Backstop for exactly-once mission completion.
        manager
            .create_index(
                Index::create()
                    .name("ux_user_missions_user_mission")
                    .table(UserMissions::Table)
                    .col(UserMissions::UserId)
                    .col(UserMissions::MissionId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QuestionsOfTheDay::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuestionsOfTheDay::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QuestionsOfTheDay::Question).text().not_null())
                    .col(ColumnDef::new(QuestionsOfTheDay::ActiveDate).date().not_null())
                    .col(
                        ColumnDef::new(QuestionsOfTheDay::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_questions_active_date")
                    .table(QuestionsOfTheDay::Table)
                    .col(QuestionsOfTheDay::ActiveDate)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserResponses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserResponses::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserResponses::UserId).uuid().not_null())
                    .col(ColumnDef::new(UserResponses::QuestionId).uuid().not_null())
                    .col(ColumnDef::new(UserResponses::Response).text().not_null())
                    .col(
                        ColumnDef::new(UserResponses::SentencesCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserResponses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_user_responses_user_question")
                    .table(UserResponses::Table)
                    .col(UserResponses::UserId)
                    .col(UserResponses::QuestionId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserResponses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(QuestionsOfTheDay::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserMissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Missions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await
    }
}
