//! One pick per identity.
//!
//! The eligibility check and the two writes run inside a single critical
//! section and a single `BEGIN IMMEDIATE` transaction, so concurrent requests
//! from the same identity can never both pass the check. The transaction holds
//! the database write lock from its first statement; other writers on the
//! file (room draws included) wait on the busy timeout rather than failing
//! a half-done pick with `SQLITE_BUSY`. The primary key on
//! `used_identities.identity` catches anything that slips past the lock, such
//! as a second process sharing the database file.

use std::sync::Arc;

use rand::{seq::IndexedRandom, Rng};
use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::{caller::Caller, error::DrawError, participants::ParticipantSource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct PickRecord {
    pub id: i64,
    pub identity: String,
    pub participant: String,
    #[serde(with = "time::serde::rfc3339")]
    pub picked_at: OffsetDateTime,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub selection: Option<String>,
}

#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
    participants: Arc<dyn ParticipantSource>,
    write_lock: Arc<Mutex<()>>,
}

/// Uniform choice over `pool`; `None` when there is nobody to choose.
pub fn draw<'a, R: Rng + ?Sized>(pool: &'a [String], rng: &mut R) -> Option<&'a String> {
    pool.choose(rng)
}

impl Ledger {
    pub fn new(pool: SqlitePool, participants: Arc<dyn ParticipantSource>) -> Self {
        Self {
            pool,
            participants,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn participants(&self) -> Vec<String> {
        self.participants.list_participants()
    }

    pub async fn check_eligibility(&self, identity: &str) -> Result<Eligibility, DrawError> {
        let used: Option<(String,)> =
            sqlx::query_as("SELECT identity FROM used_identities WHERE identity = ?")
                .bind(identity)
                .fetch_optional(&self.pool)
                .await?;

        if used.is_none() {
            return Ok(Eligibility { eligible: true, selection: None });
        }

        let selection: Option<(String,)> = sqlx::query_as(
            "SELECT participant FROM pick_records WHERE identity = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?;

        Ok(Eligibility {
            eligible: false,
            selection: selection.map(|(participant,)| participant),
        })
    }

    pub async fn pick(&self, caller: &Caller) -> Result<PickRecord, DrawError> {
        let participants = self.participants.list_participants();

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let used: Option<(String,)> =
            sqlx::query_as("SELECT identity FROM used_identities WHERE identity = ?")
                .bind(&caller.identity)
                .fetch_optional(&mut *tx)
                .await?;
        if used.is_some() {
            return Err(DrawError::AlreadyPicked);
        }

        let drawn = {
            let mut rng = rand::rng();
            draw(&participants, &mut rng).cloned()
        };
        let Some(participant) = drawn else {
            return Err(DrawError::NoParticipants);
        };
        let now = OffsetDateTime::now_utc();

        let inserted = sqlx::query(
            "INSERT INTO used_identities (identity, used_at, user_agent) VALUES (?, ?, ?) \
             ON CONFLICT(identity) DO NOTHING",
        )
        .bind(&caller.identity)
        .bind(now)
        .bind(&caller.user_agent)
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() == 0 {
            return Err(DrawError::AlreadyPicked);
        }

        let id = sqlx::query(
            "INSERT INTO pick_records (identity, participant, picked_at, user_agent) VALUES (?, ?, ?, ?)",
        )
        .bind(&caller.identity)
        .bind(&participant)
        .bind(now)
        .bind(&caller.user_agent)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        info!(identity = %caller.identity, participant = %participant, "participant picked");
        Ok(PickRecord {
            id,
            identity: caller.identity.clone(),
            participant,
            picked_at: now,
            user_agent: caller.user_agent.clone(),
        })
    }

    /// Every pick ever made, oldest first. A read failure is logged and
    /// answered with an empty log.
    pub async fn picks_log(&self) -> Vec<PickRecord> {
        let result = sqlx::query_as::<_, PickRecord>(
            "SELECT id, identity, participant, picked_at, user_agent FROM pick_records ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await;

        result.unwrap_or_else(|err| {
            error!(error = %err, "could not read picks log, returning empty");
            Vec::new()
        })
    }

    /// Forgets every identity and every pick.
    pub async fn reset_all(&self) -> Result<(), DrawError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let identities = sqlx::query("DELETE FROM used_identities").execute(&mut *tx).await?;
        let picks = sqlx::query("DELETE FROM pick_records").execute(&mut *tx).await?;
        tx.commit().await?;

        info!(
            identities = identities.rows_affected(),
            picks = picks.rows_affected(),
            "ledger reset"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{db, participants::StaticParticipants, rooms::RoomBook};

    async fn ledger(names: &[&str]) -> Ledger {
        Ledger::new(db::memory().await, roster(names))
    }

    fn caller(identity: &str) -> Caller {
        Caller::new(identity, "test-agent")
    }

    fn roster(list: &[&str]) -> Arc<StaticParticipants> {
        Arc::new(StaticParticipants(list.iter().map(|n| n.to_string()).collect()))
    }

    #[tokio::test]
    async fn one_pick_per_identity() {
        let ledger = ledger(&["Ann", "Bob", "Cy"]).await;

        let first = ledger.pick(&caller("10.0.0.1")).await.unwrap();
        assert!(["Ann", "Bob", "Cy"].contains(&first.participant.as_str()));

        for _ in 0..3 {
            let err = ledger.pick(&caller("10.0.0.1")).await.unwrap_err();
            assert!(matches!(err, DrawError::AlreadyPicked));
        }

        let log = ledger.picks_log().await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].id, first.id);
        assert_eq!(log[0].participant, first.participant);
        assert_eq!(log[0].user_agent, "test-agent");
    }

    #[tokio::test]
    async fn eligibility_reports_previous_selection() {
        let ledger = ledger(&["Ann"]).await;

        let before = ledger.check_eligibility("10.0.0.1").await.unwrap();
        assert_eq!(before, Eligibility { eligible: true, selection: None });

        ledger.pick(&caller("10.0.0.1")).await.unwrap();
        let after = ledger.check_eligibility("10.0.0.1").await.unwrap();
        assert_eq!(after, Eligibility { eligible: false, selection: Some("Ann".into()) });

        assert!(ledger.check_eligibility("10.0.0.2").await.unwrap().eligible);
    }

    #[tokio::test]
    async fn empty_list_writes_nothing() {
        let ledger = ledger(&[]).await;

        let err = ledger.pick(&caller("10.0.0.1")).await.unwrap_err();
        assert!(matches!(err, DrawError::NoParticipants));
        assert!(ledger.picks_log().await.is_empty());
        assert!(ledger.check_eligibility("10.0.0.1").await.unwrap().eligible);
    }

    #[tokio::test]
    async fn concurrent_picks_for_one_identity() {
        let ledger = ledger(&["Ann", "Bob"]).await;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.pick(&caller("198.51.100.4")).await })
            })
            .collect();

        let mut wins = 0;
        let mut refused = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(DrawError::AlreadyPicked) => refused += 1,
                Err(other) => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(refused, 15);
        assert_eq!(ledger.picks_log().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_picks_for_one_identity_on_a_file() {
        let (pool, path) = db::temp_file().await;
        let ledger = Ledger::new(pool.clone(), roster(&["Ann", "Bob"]));

        let handles: Vec<_> = (0..24)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.pick(&caller("198.51.100.4")).await })
            })
            .collect();

        let mut wins = 0;
        let mut refused = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(DrawError::AlreadyPicked) => refused += 1,
                Err(other) => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(refused, 23);
        assert_eq!(ledger.picks_log().await.len(), 1);

        db::remove_temp_file(pool, path).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn picks_survive_room_traffic_on_a_file() {
        let (pool, path) = db::temp_file().await;
        let ledger = Ledger::new(pool.clone(), roster(&["Ann", "Bob", "Cy"]));
        let rooms = RoomBook::new(pool.clone());

        let picks: Vec<_> = (0..120)
            .map(|i| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.pick(&caller(&format!("10.2.0.{i}"))).await })
            })
            .collect();
        let draws: Vec<_> = (0..120)
            .map(|i| {
                let rooms = rooms.clone();
                tokio::spawn(async move {
                    let emails = vec![format!("a{i}@x.com"), format!("b{i}@x.com")];
                    let room = rooms.create_room(&format!("Room {i}"), "", &emails).await?;
                    rooms.pick_winner(room.id).await
                })
            })
            .collect();

        for handle in picks {
            if let Err(err) = handle.await.unwrap() {
                panic!("pick failed under load: {err:?}");
            }
        }
        for handle in draws {
            if let Err(err) = handle.await.unwrap() {
                panic!("room draw failed under load: {err:?}");
            }
        }
        assert_eq!(ledger.picks_log().await.len(), 120);
        assert_eq!(rooms.list_rooms().await.len(), 120);

        db::remove_temp_file(pool, path).await;
    }

    #[tokio::test]
    async fn reset_lets_everyone_pick_again() {
        let ledger = ledger(&["Ann", "Bob"]).await;
        ledger.pick(&caller("a")).await.unwrap();
        ledger.pick(&caller("b")).await.unwrap();
        assert_eq!(ledger.picks_log().await.len(), 2);

        ledger.reset_all().await.unwrap();
        assert!(ledger.picks_log().await.is_empty());

        ledger.pick(&caller("a")).await.unwrap();
        assert_eq!(ledger.picks_log().await.len(), 1);
    }

    #[tokio::test]
    async fn distinct_identities_always_get_a_participant() {
        let names = ["Ann", "Bob", "Cy", "Di"];
        let ledger = ledger(&names).await;
        for i in 0..50 {
            let record = ledger.pick(&caller(&format!("10.1.0.{i}"))).await.unwrap();
            assert!(names.contains(&record.participant.as_str()));
        }
        assert_eq!(ledger.picks_log().await.len(), 50);
    }

    #[test]
    fn draw_is_uniform() {
        const N: usize = 10;
        const M: usize = 10_000;
        // chi-square, 9 degrees of freedom, p = 0.001
        const CRITICAL: f64 = 27.877;

        let pool: Vec<String> = (0..N).map(|i| format!("p{i}")).collect();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut counts = [0usize; N];
        for _ in 0..M {
            let picked = draw(&pool, &mut rng).unwrap();
            let index = pool.iter().position(|p| p == picked).unwrap();
            counts[index] += 1;
        }

        let expected = M as f64 / N as f64;
        let chi_square: f64 = counts
            .iter()
            .map(|&observed| (observed as f64 - expected).powi(2) / expected)
            .sum();
        assert!(chi_square < CRITICAL, "chi-square {chi_square} for {counts:?}");
    }

    #[test]
    fn draw_from_nothing() {
        assert!(draw(&[], &mut rand::rng()).is_none());
    }
}
