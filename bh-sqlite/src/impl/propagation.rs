use crate::{
    Db,
    types::{DateTime, PendingRow, PropagationRow},
};
use bh_core::{
    models::{Bid, BidDraft, BidId, BidSource, Propagation, PropagationState},
    ports::PropagationRepository,
};
use time::OffsetDateTime;

impl PropagationRepository for Db {
    async fn create_bid_with_propagation(
        &self,
        bid: &BidDraft,
        targets: &[BidSource],
        as_of: OffsetDateTime,
    ) -> Result<Result<Bid, Bid>, Self::Error> {
        let mut tx = self.writer.begin().await?;

        let Some(created) = Self::insert_bid(&mut *tx, bid).await? else {
            let existing = Self::conflicting_bid(&mut *tx, bid).await?;
            tx.rollback().await?;
            return Ok(Err(existing));
        };

        let as_of = DateTime::from(as_of);
        for target in targets {
            sqlx::query(
                r#"
                insert into
                    bid_propagation (bid_id, target, state, attempts, updated_at)
                values
                    ($1, $2, $3, 0, $4)
                "#,
            )
            .bind(created.id.0)
            .bind(target.as_str())
            .bind(PropagationState::Pending.as_str())
            .bind(as_of)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Ok(created))
    }

    async fn get_propagations(&self, bid_id: BidId) -> Result<Vec<Propagation>, Self::Error> {
        sqlx::query_as::<_, PropagationRow>(
            r#"
            select
                bid_id, target, state, attempts, last_error, updated_at
            from
                bid_propagation
            where
                bid_id = $1
            order by
                target
            "#,
        )
        .bind(bid_id.0)
        .fetch_all(&self.reader)
        .await?
        .into_iter()
        .map(Propagation::try_from)
        .collect()
    }

    async fn pending_propagations(
        &self,
        limit: usize,
    ) -> Result<Vec<(Bid, Propagation)>, Self::Error> {
        sqlx::query_as::<_, PendingRow>(
            r#"
            select
                bid.id, bid.auction_id, bid.developer_id, bid.amount_cents, bid.key,
                bid.created_at, bid.updated_at,
                p.target, p.state, p.attempts, p.last_error, p.updated_at as propagated_at
            from
                bid_propagation p
            join
                bid on bid.id = p.bid_id
            where
                p.state = $1
            order by
                p.updated_at, p.bid_id, p.target
            limit $2
            "#,
        )
        .bind(PropagationState::Pending.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.reader)
        .await?
        .into_iter()
        .map(<(Bid, Propagation)>::try_from)
        .collect()
    }

    async fn record_propagation(
        &self,
        bid_id: BidId,
        target: BidSource,
        outcome: Result<(), String>,
        max_attempts: u32,
        as_of: OffsetDateTime,
    ) -> Result<Option<Propagation>, Self::Error> {
        let as_of = DateTime::from(as_of);
        let row = match outcome {
            Ok(()) => {
                sqlx::query_as::<_, PropagationRow>(
                    r#"
                    update
                        bid_propagation
                    set
                        state = $1,
                        last_error = null,
                        updated_at = $2
                    where
                        bid_id = $3
                    and
                        target = $4
                    returning
                        bid_id, target, state, attempts, last_error, updated_at
                    "#,
                )
                .bind(PropagationState::Done.as_str())
                .bind(as_of)
                .bind(bid_id.0)
                .bind(target.as_str())
                .fetch_optional(&self.writer)
                .await?
            }
            Err(message) => {
                // a copy that already landed stays done
                sqlx::query_as::<_, PropagationRow>(
                    r#"
                    update
                        bid_propagation
                    set
                        attempts = attempts + 1,
                        last_error = $1,
                        state = case when attempts + 1 >= $2 then $3 else state end,
                        updated_at = $4
                    where
                        bid_id = $5
                    and
                        target = $6
                    and
                        state = $7
                    returning
                        bid_id, target, state, attempts, last_error, updated_at
                    "#,
                )
                .bind(message)
                .bind(i64::from(max_attempts))
                .bind(PropagationState::Failed.as_str())
                .bind(as_of)
                .bind(bid_id.0)
                .bind(target.as_str())
                .bind(PropagationState::Pending.as_str())
                .fetch_optional(&self.writer)
                .await?
            }
        };

        row.map(Propagation::try_from).transpose()
    }
}
