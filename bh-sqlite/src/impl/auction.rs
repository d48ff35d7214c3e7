use crate::{
    Db,
    types::{AuctionRow, DateTime},
};
use bh_core::{
    models::{Auction, AuctionChanges, AuctionId, AuctionQuery, AuctionStatus, NewAuction},
    ports::AuctionRepository,
};
use time::OffsetDateTime;

impl AuctionRepository for Db {
    async fn get_auction(&self, auction_id: AuctionId) -> Result<Option<Auction>, Self::Error> {
        sqlx::query_as::<_, AuctionRow>(
            r#"
            select
                id, project_id, bidding_started_at, bidding_deadline, status, created_at, updated_at
            from
                auction
            where
                id = $1
            "#,
        )
        .bind(auction_id.0)
        .fetch_optional(&self.reader)
        .await?
        .map(Auction::try_from)
        .transpose()
    }

    async fn create_auction(
        &self,
        auction: &NewAuction,
        as_of: OffsetDateTime,
    ) -> Result<Result<Auction, AuctionId>, Self::Error> {
        let as_of = DateTime::from(as_of);
        let created = sqlx::query_as::<_, AuctionRow>(
            r#"
            insert into
                auction (
                    project_id, bidding_started_at, bidding_deadline, status, created_at, updated_at
                )
            values
                ($1, $2, $3, $4, $5, $5)
            on conflict (project_id)
                do nothing
            returning
                id, project_id, bidding_started_at, bidding_deadline, status, created_at, updated_at
            "#,
        )
        .bind(auction.project_id.0)
        .bind(DateTime::from(auction.bidding_started_at))
        .bind(DateTime::from(auction.bidding_deadline))
        .bind(u8::from(AuctionStatus::Pending))
        .bind(as_of)
        .fetch_optional(&self.writer)
        .await?;

        if let Some(row) = created {
            return Ok(Ok(row.try_into()?));
        }

        let existing =
            sqlx::query_scalar::<_, i64>("select id from auction where project_id = $1")
                .bind(auction.project_id.0)
                .fetch_one(&self.writer)
                .await?;
        Ok(Err(AuctionId(existing)))
    }

    async fn query_auctions(&self, query: &AuctionQuery) -> Result<Vec<Auction>, Self::Error> {
        let mut builder = sqlx::QueryBuilder::new(
            r#"
            select
                id, project_id, bidding_started_at, bidding_deadline, status, created_at, updated_at
            from
                auction
            where
                1 = 1
            "#,
        );
        if let Some(project_id) = query.project_id {
            builder.push(" and project_id = ").push_bind(project_id.0);
        }
        if let Some(status) = query.status {
            builder.push(" and status = ").push_bind(u8::from(status));
        }
        if let Some(start_date) = query.start_date {
            builder
                .push(" and bidding_started_at >= ")
                .push_bind(DateTime::from(start_date));
        }
        if let Some(end_date) = query.end_date {
            builder
                .push(" and bidding_deadline <= ")
                .push_bind(DateTime::from(end_date));
        }
        builder.push(" order by created_at, id");

        builder
            .build_query_as::<AuctionRow>()
            .fetch_all(&self.reader)
            .await?
            .into_iter()
            .map(Auction::try_from)
            .collect()
    }

    async fn update_auction(
        &self,
        auction_id: AuctionId,
        changes: &AuctionChanges,
        as_of: OffsetDateTime,
    ) -> Result<Option<Auction>, Self::Error> {
        sqlx::query_as::<_, AuctionRow>(
            r#"
            update
                auction
            set
                status = $1,
                bidding_deadline = $2,
                updated_at = $3
            where
                id = $4
            and
                status = $5
            returning
                id, project_id, bidding_started_at, bidding_deadline, status, created_at, updated_at
            "#,
        )
        .bind(u8::from(changes.status))
        .bind(DateTime::from(changes.bidding_deadline))
        .bind(DateTime::from(as_of))
        .bind(auction_id.0)
        .bind(u8::from(changes.expected))
        .fetch_optional(&self.writer)
        .await?
        .map(Auction::try_from)
        .transpose()
    }

    async fn delete_auction(&self, auction_id: AuctionId) -> Result<bool, Self::Error> {
        // bids and their outbox entries go with it via `on delete cascade`
        let result = sqlx::query(
            r#"
            delete from
                auction
            where
                id = $1
            and
                status in ($2, $3)
            "#,
        )
        .bind(auction_id.0)
        .bind(u8::from(AuctionStatus::Pending))
        .bind(u8::from(AuctionStatus::Cancelled))
        .execute(&self.writer)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn expire_auctions(&self, as_of: OffsetDateTime) -> Result<Vec<AuctionId>, Self::Error> {
        let expired = sqlx::query_scalar::<_, i64>(
            r#"
            update
                auction
            set
                status = $1,
                updated_at = $3
            where
                status = $2
            and
                bidding_deadline < $3
            returning
                id
            "#,
        )
        .bind(u8::from(AuctionStatus::Completed))
        .bind(u8::from(AuctionStatus::Active))
        .bind(DateTime::from(as_of))
        .fetch_all(&self.writer)
        .await?;

        Ok(expired.into_iter().map(AuctionId).collect())
    }
}
