use rand::seq::IndexedRandom;
use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::DrawError;

use super::email;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Active,
    Completed,
}

impl RoomStatus {
    fn as_str(self) -> &'static str {
        match self {
            RoomStatus::Active => "active",
            RoomStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub participants: Vec<String>,
    pub status: RoomStatus,
    pub winner: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub picked_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(sqlx::FromRow)]
struct RoomRow {
    id: String,
    name: String,
    description: String,
    participants: String,
    status: String,
    winner: Option<String>,
    picked_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl TryFrom<RoomRow> for Room {
    type Error = sqlx::Error;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        let decode = |e: Box<dyn std::error::Error + Send + Sync>| sqlx::Error::Decode(e);

        let status = match row.status.as_str() {
            "active" => RoomStatus::Active,
            "completed" => RoomStatus::Completed,
            other => return Err(decode(format!("unknown room status {other:?}").into())),
        };

        Ok(Room {
            id: Uuid::parse_str(&row.id).map_err(|e| decode(e.into()))?,
            name: row.name,
            description: row.description,
            participants: serde_json::from_str(&row.participants).map_err(|e| decode(e.into()))?,
            status,
            winner: row.winner,
            picked_at: row.picked_at,
            created_at: row.created_at,
        })
    }
}

const SELECT_ROOM: &str = "SELECT id, name, description, participants, status, winner, picked_at, created_at FROM rooms";

/// Rooms and their one-shot winner draw.
#[derive(Clone)]
pub struct RoomBook {
    pool: SqlitePool,
}

impl RoomBook {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_room(
        &self,
        name: &str,
        description: &str,
        emails: &[String],
    ) -> Result<Room, DrawError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DrawError::InvalidInput("room name is required".into()));
        }
        if emails.is_empty() {
            return Err(DrawError::InvalidInput("at least one email is required".into()));
        }
        let participants = email::normalize(emails).map_err(DrawError::InvalidEmail)?;

        let room = Room {
            id: Uuid::now_v7(),
            name: name.to_owned(),
            description: description.trim().to_owned(),
            participants,
            status: RoomStatus::Active,
            winner: None,
            picked_at: None,
            created_at: OffsetDateTime::now_utc(),
        };

        let participants_json = serde_json::to_string(&room.participants)
            .map_err(|e| sqlx::Error::Encode(e.into()))?;
        sqlx::query(
            "INSERT INTO rooms (id, name, description, participants, status, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(room.id.to_string())
        .bind(&room.name)
        .bind(&room.description)
        .bind(participants_json)
        .bind(room.status.as_str())
        .bind(room.created_at)
        .execute(&self.pool)
        .await?;

        info!(room_id = %room.id, name = %room.name, participants = room.participants.len(), "room created");
        Ok(room)
    }

    pub async fn get_room(&self, id: Uuid) -> Result<Room, DrawError> {
        let row: Option<RoomRow> = sqlx::query_as(&format!("{SELECT_ROOM} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Room::try_from(row)?),
            None => Err(DrawError::NotFound(id)),
        }
    }

    /// Newest first. Unreadable storage is logged and reads as no rooms.
    pub async fn list_rooms(&self) -> Vec<Room> {
        let rows = sqlx::query_as::<_, RoomRow>(&format!("{SELECT_ROOM} ORDER BY created_at DESC, rowid DESC"))
            .fetch_all(&self.pool)
            .await;

        let rows = match rows {
            Ok(rows) => rows,
            Err(err) => {
                error!(error = %err, "could not read rooms, returning empty");
                return Vec::new();
            }
        };

        rows.into_iter()
            .filter_map(|row| match Room::try_from(row) {
                Ok(room) => Some(room),
                Err(err) => {
                    error!(error = %err, "skipping unreadable room");
                    None
                }
            })
            .collect()
    }

    /// Draws the winner and closes the room.
    ///
    /// The update only applies to a room that is still active and winnerless,
    /// so when two draws race exactly one of them lands; the other re-reads
    /// the room and reports why it lost.
    pub async fn pick_winner(&self, id: Uuid) -> Result<Room, DrawError> {
        let room = self.get_room(id).await?;
        refuse_closed(&room)?;

        let winner = {
            let mut rng = rand::rng();
            room.participants.choose(&mut rng).cloned()
        };
        let Some(winner) = winner else {
            return Err(DrawError::NoParticipants);
        };
        let picked_at = OffsetDateTime::now_utc();

        let updated = sqlx::query(
            "UPDATE rooms SET winner = ?, picked_at = ?, status = 'completed' \
             WHERE id = ? AND status = 'active' AND winner IS NULL",
        )
        .bind(&winner)
        .bind(picked_at)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            let current = self.get_room(id).await?;
            refuse_closed(&current)?;
            return Err(DrawError::AlreadyPicked);
        }

        info!(room_id = %id, winner = %winner, "room winner picked");
        Ok(Room {
            status: RoomStatus::Completed,
            winner: Some(winner),
            picked_at: Some(picked_at),
            ..room
        })
    }
}

fn refuse_closed(room: &Room) -> Result<(), DrawError> {
    if room.winner.is_some() {
        return Err(DrawError::AlreadyPicked);
    }
    if room.status != RoomStatus::Active {
        return Err(DrawError::NotActive);
    }
    Ok(())
}
