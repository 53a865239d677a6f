use crate::db::models::{ActivityWithParticipants, DbActivity, DbRegistration, NewActivity};
use crate::db::schema::SQLITE_INIT;
use crate::error::{MergingtonError, is_unique_violation};
use ahash::AHashMap;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::{str::FromStr, time::Duration};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum DbActorMessage {
    /// List every activity together with its participants.
    ListActivities(RpcReplyPort<Result<Vec<ActivityWithParticipants>, MergingtonError>>),

    /// Insert a new activity; fails if the name is taken.
    CreateActivity(NewActivity, RpcReplyPort<Result<DbActivity, MergingtonError>>),

    /// Register (activity name, email).
    Signup(
        String,
        String,
        RpcReplyPort<Result<DbRegistration, MergingtonError>>,
    ),

    /// Remove the registration for (activity name, email).
    Unregister(String, String, RpcReplyPort<Result<(), MergingtonError>>),

    /// Delete an activity by name; its registrations go with it.
    /// Returns the number of registrations that were removed.
    DeleteActivity(String, RpcReplyPort<Result<u64, MergingtonError>>),
}

/// Cloneable handle to the process-wide database actor.
///
/// Every call is one unit of work: the actor opens a transaction for it and
/// either commits or explicitly rolls it back before replying.
/// Writes are applied one message at a time, so a capacity check and the
/// insert it guards can never interleave with another signup.
#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn list_activities(&self) -> Result<Vec<ActivityWithParticipants>, MergingtonError> {
        ractor::call!(self.actor, DbActorMessage::ListActivities).map_err(|e| {
            MergingtonError::RactorError(format!("DbActor ListActivities RPC failed: {e}"))
        })?
    }

    pub async fn create_activity(
        &self,
        activity: NewActivity,
    ) -> Result<DbActivity, MergingtonError> {
        ractor::call!(self.actor, DbActorMessage::CreateActivity, activity).map_err(|e| {
            MergingtonError::RactorError(format!("DbActor CreateActivity RPC failed: {e}"))
        })?
    }

    pub async fn signup(
        &self,
        activity_name: String,
        email: String,
    ) -> Result<DbRegistration, MergingtonError> {
        ractor::call!(self.actor, DbActorMessage::Signup, activity_name, email)
            .map_err(|e| MergingtonError::RactorError(format!("DbActor Signup RPC failed: {e}")))?
    }

    pub async fn unregister(
        &self,
        activity_name: String,
        email: String,
    ) -> Result<(), MergingtonError> {
        ractor::call!(self.actor, DbActorMessage::Unregister, activity_name, email).map_err(
            |e| MergingtonError::RactorError(format!("DbActor Unregister RPC failed: {e}")),
        )?
    }

    pub async fn delete_activity(&self, activity_name: String) -> Result<u64, MergingtonError> {
        ractor::call!(self.actor, DbActorMessage::DeleteActivity, activity_name).map_err(|e| {
            MergingtonError::RactorError(format!("DbActor DeleteActivity RPC failed: {e}"))
        })?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // The actor handles one message at a time; a single connection keeps
        // every unit of work on the same SQLite handle.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.pool.close().await;
        info!("DbActor stopped, pool closed");
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbActorMessage::ListActivities(reply) => {
                let res = self.list_activities(&state.pool).await;
                let _ = reply.send(res);
            }
            DbActorMessage::CreateActivity(activity, reply) => {
                let res = self.create_activity(&state.pool, activity).await;
                let _ = reply.send(res);
            }
            DbActorMessage::Signup(activity_name, email, reply) => {
                let res = self.signup(&state.pool, &activity_name, &email).await;
                let _ = reply.send(res);
            }
            DbActorMessage::Unregister(activity_name, email, reply) => {
                let res = self.unregister(&state.pool, &activity_name, &email).await;
                let _ = reply.send(res);
            }
            DbActorMessage::DeleteActivity(activity_name, reply) => {
                let res = self.delete_activity(&state.pool, &activity_name).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

impl DbActor {
    async fn list_activities(
        &self,
        pool: &SqlitePool,
    ) -> Result<Vec<ActivityWithParticipants>, MergingtonError> {
        // One read transaction so both queries see the same snapshot.
        let mut tx = pool.begin().await?;
        let res = load_rows(&mut *tx).await;
        let (activities, registrations) = finish(tx, res).await?;

        let mut by_activity: AHashMap<i64, Vec<String>> = AHashMap::new();
        for reg in registrations {
            by_activity.entry(reg.activity_id).or_default().push(reg.email);
        }

        Ok(activities
            .into_iter()
            .map(|activity| {
                let participants = by_activity.remove(&activity.id).unwrap_or_default();
                ActivityWithParticipants {
                    activity,
                    participants,
                }
            })
            .collect())
    }

    async fn create_activity(
        &self,
        pool: &SqlitePool,
        activity: NewActivity,
    ) -> Result<DbActivity, MergingtonError> {
        let mut tx = pool.begin().await?;
        let res = insert_activity(&mut *tx, activity).await;
        let row = finish(tx, res).await?;

        info!(activity_id = row.id, name = %row.name, "activity created");
        Ok(row)
    }

    async fn signup(
        &self,
        pool: &SqlitePool,
        activity_name: &str,
        email: &str,
    ) -> Result<DbRegistration, MergingtonError> {
        let mut tx = pool.begin().await?;
        let res = insert_registration(&mut *tx, activity_name, email).await;
        let registration = finish(tx, res).await?;

        info!(
            activity_id = registration.activity_id,
            registration_id = registration.id,
            email = %registration.email,
            "student signed up"
        );
        Ok(registration)
    }

    async fn unregister(
        &self,
        pool: &SqlitePool,
        activity_name: &str,
        email: &str,
    ) -> Result<(), MergingtonError> {
        let mut tx = pool.begin().await?;
        let res = remove_registration(&mut *tx, activity_name, email).await;
        let activity_id = finish(tx, res).await?;

        info!(activity_id, email = %email, "student unregistered");
        Ok(())
    }

    async fn delete_activity(
        &self,
        pool: &SqlitePool,
        activity_name: &str,
    ) -> Result<u64, MergingtonError> {
        let mut tx = pool.begin().await?;
        let res = remove_activity(&mut *tx, activity_name).await;
        let (activity, registrations) = finish(tx, res).await?;

        info!(
            activity_id = activity.id,
            name = %activity.name,
            registrations,
            "activity deleted"
        );
        Ok(registrations)
    }
}

/// Ends a unit of work: commit on success, explicit rollback otherwise.
///
/// A rejected write (a capacity miss, a DELETE matching nothing) still holds
/// SQLite's write lock, so the rollback must complete before the connection
/// serves the next message.
async fn finish<T>(
    tx: Transaction<'_, Sqlite>,
    res: Result<T, MergingtonError>,
) -> Result<T, MergingtonError> {
    match res {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(e) = tx.rollback().await {
                warn!(error = %e, "transaction rollback failed");
            }
            Err(err)
        }
    }
}

async fn load_rows(
    conn: &mut SqliteConnection,
) -> Result<(Vec<DbActivity>, Vec<DbRegistration>), MergingtonError> {
    let activities = sqlx::query_as::<_, DbActivity>(
        r#"
    SELECT id, name, description, schedule, max_participants
    FROM activities
    ORDER BY id
    "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let registrations = sqlx::query_as::<_, DbRegistration>(
        r#"
    SELECT id, email, activity_id, created_at
    FROM registrations
    ORDER BY activity_id, id
    "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok((activities, registrations))
}

async fn insert_activity(
    conn: &mut SqliteConnection,
    activity: NewActivity,
) -> Result<DbActivity, MergingtonError> {
    if find_activity(&mut *conn, &activity.name).await?.is_some() {
        return Err(MergingtonError::ActivityExists);
    }

    sqlx::query_as::<_, DbActivity>(
        r#"
    INSERT INTO activities (name, description, schedule, max_participants)
    VALUES (?, ?, ?, ?)
    RETURNING id, name, description, schedule, max_participants
    "#,
    )
    .bind(activity.name)
    .bind(activity.description)
    .bind(activity.schedule)
    .bind(activity.max_participants)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            MergingtonError::ActivityExists
        } else {
            MergingtonError::from(e)
        }
    })
}

async fn insert_registration(
    conn: &mut SqliteConnection,
    activity_name: &str,
    email: &str,
) -> Result<DbRegistration, MergingtonError> {
    let activity = find_activity(&mut *conn, activity_name)
        .await?
        .ok_or(MergingtonError::ActivityNotFound)?;

    if find_registration(&mut *conn, activity.id, email)
        .await?
        .is_some()
    {
        return Err(MergingtonError::AlreadySignedUp);
    }

    // Count and insert in one statement; no row comes back when the activity is full.
    let inserted = sqlx::query_as::<_, DbRegistration>(
        r#"
    INSERT INTO registrations (email, activity_id, created_at)
    SELECT ?, a.id, ?
    FROM activities a
    WHERE a.id = ?
      AND (
        a.max_participants IS NULL
        OR (SELECT COUNT(*) FROM registrations r WHERE r.activity_id = a.id) < a.max_participants
      )
    RETURNING id, email, activity_id, created_at
    "#,
    )
    .bind(email)
    .bind(Utc::now())
    .bind(activity.id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            MergingtonError::AlreadySignedUp
        } else {
            MergingtonError::from(e)
        }
    })?;

    inserted.ok_or_else(|| {
        debug!(
            activity_id = activity.id,
            max_participants = ?activity.max_participants,
            "signup rejected, activity at capacity"
        );
        MergingtonError::ActivityFull
    })
}

/// Returns the id of the activity the registration was removed from.
async fn remove_registration(
    conn: &mut SqliteConnection,
    activity_name: &str,
    email: &str,
) -> Result<i64, MergingtonError> {
    let activity = find_activity(&mut *conn, activity_name)
        .await?
        .ok_or(MergingtonError::ActivityNotFound)?;

    let deleted = sqlx::query(
        r#"
    DELETE FROM registrations
    WHERE activity_id = ? AND email = ?
    "#,
    )
    .bind(activity.id)
    .bind(email)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if deleted == 0 {
        return Err(MergingtonError::NotSignedUp);
    }
    Ok(activity.id)
}

async fn remove_activity(
    conn: &mut SqliteConnection,
    activity_name: &str,
) -> Result<(DbActivity, u64), MergingtonError> {
    let activity = find_activity(&mut *conn, activity_name)
        .await?
        .ok_or(MergingtonError::ActivityNotFound)?;

    let registrations: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM registrations WHERE activity_id = ?")
            .bind(activity.id)
            .fetch_one(&mut *conn)
            .await?;

    // Registrations are removed by the ON DELETE CASCADE foreign key.
    sqlx::query("DELETE FROM activities WHERE id = ?")
        .bind(activity.id)
        .execute(&mut *conn)
        .await?;

    Ok((activity, u64::try_from(registrations).unwrap_or_default()))
}

async fn find_activity(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<DbActivity>, sqlx::Error> {
    sqlx::query_as::<_, DbActivity>(
        r#"
    SELECT id, name, description, schedule, max_participants
    FROM activities
    WHERE name = ?
    "#,
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
}

async fn find_registration(
    conn: &mut SqliteConnection,
    activity_id: i64,
    email: &str,
) -> Result<Option<DbRegistration>, sqlx::Error> {
    sqlx::query_as::<_, DbRegistration>(
        r#"
    SELECT id, email, activity_id, created_at
    FROM registrations
    WHERE activity_id = ? AND email = ?
    "#,
    )
    .bind(activity_id)
    .bind(email)
    .fetch_optional(&mut *conn)
    .await
}

/// Spawn the database actor, creating the schema if needed, and return a cloneable handle.
pub async fn spawn(database_url: &str) -> Result<DbActorHandle, MergingtonError> {
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, database_url.to_string())
        .await
        .map_err(|e| MergingtonError::RactorError(format!("failed to spawn DbActor: {e}")))?;

    Ok(DbActorHandle { actor })
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), MergingtonError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
