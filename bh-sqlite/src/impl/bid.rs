use crate::{
    Db,
    types::{BidRow, DateTime},
};
use bh_core::{
    models::{Amount, AuctionId, Bid, BidDraft, BidId, BidKey, BidSource, DeveloperId},
    ports::{BidRepository, PrimaryBidRepository},
};
use time::OffsetDateTime;

impl Db {
    /// Insert a bid unless it collides with an existing one.
    ///
    /// Generic over the executor so the outbox can reuse it inside its
    /// transaction.
    pub(crate) async fn insert_bid<'e, E>(
        executor: E,
        bid: &BidDraft,
    ) -> Result<Option<Bid>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let created_at = DateTime::from(bid.created_at);
        sqlx::query_as::<_, BidRow>(
            r#"
            insert into
                bid (auction_id, developer_id, amount_cents, key, created_at, updated_at)
            values
                ($1, $2, $3, $4, $5, $5)
            on conflict
                do nothing
            returning
                id, auction_id, developer_id, amount_cents, key, created_at, updated_at
            "#,
        )
        .bind(bid.auction_id.0)
        .bind(bid.developer_id.0)
        .bind(bid.amount.cents())
        .bind(bid.key.to_string())
        .bind(created_at)
        .fetch_optional(executor)
        .await?
        .map(Bid::try_from)
        .transpose()
    }

    /// Find the bid that blocked an insert: same developer and auction, or same key
    pub(crate) async fn conflicting_bid<'e, E>(
        executor: E,
        bid: &BidDraft,
    ) -> Result<Bid, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query_as::<_, BidRow>(
            r#"
            select
                id, auction_id, developer_id, amount_cents, key, created_at, updated_at
            from
                bid
            where
                (auction_id = $1 and developer_id = $2)
            or
                key = $3
            order by
                id
            limit 1
            "#,
        )
        .bind(bid.auction_id.0)
        .bind(bid.developer_id.0)
        .bind(bid.key.to_string())
        .fetch_one(executor)
        .await?
        .try_into()
    }

    /// Look up a bid by its idempotency key
    pub async fn get_bid_by_key(&self, key: BidKey) -> Result<Option<Bid>, sqlx::Error> {
        sqlx::query_as::<_, BidRow>(
            r#"
            select
                id, auction_id, developer_id, amount_cents, key, created_at, updated_at
            from
                bid
            where
                key = $1
            "#,
        )
        .bind(key.to_string())
        .fetch_optional(&self.reader)
        .await?
        .map(Bid::try_from)
        .transpose()
    }
}

impl BidRepository for Db {
    type Record = Bid;

    const SOURCE: BidSource = BidSource::Relational;

    async fn get_bids_by_auction(&self, auction_id: AuctionId) -> Result<Vec<Bid>, Self::Error> {
        sqlx::query_as::<_, BidRow>(
            r#"
            select
                id, auction_id, developer_id, amount_cents, key, created_at, updated_at
            from
                bid
            where
                auction_id = $1
            order by
                created_at, id
            "#,
        )
        .bind(auction_id.0)
        .fetch_all(&self.reader)
        .await?
        .into_iter()
        .map(Bid::try_from)
        .collect()
    }

    async fn create_bid(&self, bid: &BidDraft) -> Result<Result<Bid, Bid>, Self::Error> {
        // the writer pool has a single connection, so nothing can slip in
        // between the failed insert and the lookup
        if let Some(created) = Self::insert_bid(&self.writer, bid).await? {
            return Ok(Ok(created));
        }
        Ok(Err(Self::conflicting_bid(&self.writer, bid).await?))
    }

    async fn get_last_bid(&self, auction_id: AuctionId) -> Result<Option<Bid>, Self::Error> {
        sqlx::query_as::<_, BidRow>(
            r#"
            select
                id, auction_id, developer_id, amount_cents, key, created_at, updated_at
            from
                bid
            where
                auction_id = $1
            order by
                created_at desc, id desc
            limit 1
            "#,
        )
        .bind(auction_id.0)
        .fetch_optional(&self.reader)
        .await?
        .map(Bid::try_from)
        .transpose()
    }

    async fn sync_bids(&self, bids: &[Bid]) -> Result<usize, Self::Error> {
        let mut tx = self.writer.begin().await?;
        let mut inserted = 0;
        for bid in bids {
            let draft = BidDraft::from(bid);
            if Self::insert_bid(&mut *tx, &draft).await?.is_some() {
                inserted += 1;
            }
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn get_all_bids(&self) -> Result<Vec<Bid>, Self::Error> {
        sqlx::query_as::<_, BidRow>(
            r#"
            select
                id, auction_id, developer_id, amount_cents, key, created_at, updated_at
            from
                bid
            order by
                created_at, id
            "#,
        )
        .fetch_all(&self.reader)
        .await?
        .into_iter()
        .map(Bid::try_from)
        .collect()
    }
}

impl PrimaryBidRepository for Db {
    async fn get_bid(&self, bid_id: BidId) -> Result<Option<Bid>, Self::Error> {
        sqlx::query_as::<_, BidRow>(
            r#"
            select
                id, auction_id, developer_id, amount_cents, key, created_at, updated_at
            from
                bid
            where
                id = $1
            "#,
        )
        .bind(bid_id.0)
        .fetch_optional(&self.reader)
        .await?
        .map(Bid::try_from)
        .transpose()
    }

    async fn find_bid(
        &self,
        auction_id: AuctionId,
        developer_id: DeveloperId,
    ) -> Result<Option<Bid>, Self::Error> {
        sqlx::query_as::<_, BidRow>(
            r#"
            select
                id, auction_id, developer_id, amount_cents, key, created_at, updated_at
            from
                bid
            where
                auction_id = $1
            and
                developer_id = $2
            "#,
        )
        .bind(auction_id.0)
        .bind(developer_id.0)
        .fetch_optional(&self.reader)
        .await?
        .map(Bid::try_from)
        .transpose()
    }

    async fn update_bid_amount(
        &self,
        bid_id: BidId,
        amount: Amount,
        as_of: OffsetDateTime,
    ) -> Result<Option<Bid>, Self::Error> {
        sqlx::query_as::<_, BidRow>(
            r#"
            update
                bid
            set
                amount_cents = $1,
                updated_at = $2
            where
                id = $3
            returning
                id, auction_id, developer_id, amount_cents, key, created_at, updated_at
            "#,
        )
        .bind(amount.cents())
        .bind(DateTime::from(as_of))
        .bind(bid_id.0)
        .fetch_optional(&self.writer)
        .await?
        .map(Bid::try_from)
        .transpose()
    }

    async fn delete_bid(&self, bid_id: BidId) -> Result<bool, Self::Error> {
        let result = sqlx::query("delete from bid where id = $1")
            .bind(bid_id.0)
            .execute(&self.writer)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
