use crate::{
    Db,
    types::{DateTime, WinnerRow},
};
use bh_core::{
    models::{AuctionId, Bid, Winner},
    ports::WinnerRepository,
};
use time::OffsetDateTime;

impl WinnerRepository for Db {
    async fn create_winner(
        &self,
        bid: &Bid,
        as_of: OffsetDateTime,
    ) -> Result<Result<Winner, Winner>, Self::Error> {
        let created = sqlx::query_as::<_, WinnerRow>(
            r#"
            insert into
                winner (auction_id, bid_id, winner_id, bid_amount_cents, created_at)
            values
                ($1, $2, $3, $4, $5)
            on conflict (auction_id)
                do nothing
            returning
                id, auction_id, bid_id, winner_id, bid_amount_cents, created_at
            "#,
        )
        .bind(bid.auction_id.0)
        .bind(bid.id.0)
        .bind(bid.developer_id.0)
        .bind(bid.amount.cents())
        .bind(DateTime::from(as_of))
        .fetch_optional(&self.writer)
        .await?;

        match created {
            Some(row) => Ok(Ok(row.try_into()?)),
            None => {
                let existing = sqlx::query_as::<_, WinnerRow>(
                    r#"
                    select
                        id, auction_id, bid_id, winner_id, bid_amount_cents, created_at
                    from
                        winner
                    where
                        auction_id = $1
                    "#,
                )
                .bind(bid.auction_id.0)
                .fetch_one(&self.writer)
                .await?;
                Ok(Err(existing.try_into()?))
            }
        }
    }

    async fn get_winner(&self, auction_id: AuctionId) -> Result<Option<Winner>, Self::Error> {
        sqlx::query_as::<_, WinnerRow>(
            r#"
            select
                id, auction_id, bid_id, winner_id, bid_amount_cents, created_at
            from
                winner
            where
                auction_id = $1
            "#,
        )
        .bind(auction_id.0)
        .fetch_optional(&self.reader)
        .await?
        .map(Winner::try_from)
        .transpose()
    }
}
