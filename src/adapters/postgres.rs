use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::{QueryBuilder, Row};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use crate::domain::{
    AgentRecord, AuditLogRecord, DeploymentRecord, DeploymentSummary, PositionRecord,
    PositionSummary, SignalRecord, UserAgentAddressRecord,
};
use crate::error::{DashError, Result};
use crate::ledger::{Entity, Ledger, LedgerFilter, Presence, SumField, TimeField};

/// PostgreSQL ledger adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a PostgreSQL store from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ==================== Column whitelist ====================

fn table_name(entity: Entity) -> &'static str {
    match entity {
        Entity::Deployments => "agent_deployments",
        other => other.as_str(),
    }
}

fn unsupported(entity: Entity, what: &str) -> DashError {
    DashError::Internal(format!("{} has no {what} column", entity.as_str()))
}

fn status_column(entity: Entity) -> Result<&'static str> {
    match entity {
        Entity::Agents | Entity::Deployments | Entity::Positions => Ok("status"),
        other => Err(unsupported(other, "status")),
    }
}

fn venue_column(entity: Entity) -> Result<&'static str> {
    match entity {
        Entity::Agents | Entity::Positions | Entity::Signals => Ok("venue"),
        other => Err(unsupported(other, "venue")),
    }
}

fn time_column(entity: Entity, field: TimeField) -> Result<&'static str> {
    use TimeField::*;
    match (entity, field) {
        (Entity::Deployments, SubscriptionStartedAt) => Ok("sub_started_at"),
        (Entity::Positions, OpenedAt) => Ok("opened_at"),
        (Entity::Positions, ClosedAt) => Ok("closed_at"),
        (Entity::AuditLogs, OccurredAt) => Ok("occurred_at"),
        (
            Entity::Agents
            | Entity::Deployments
            | Entity::Signals
            | Entity::BillingEvents
            | Entity::TelegramUsers
            | Entity::CtAccounts
            | Entity::ResearchInstitutes
            | Entity::UserAgentAddresses,
            CreatedAt,
        ) => Ok("created_at"),
        (other, field) => Err(unsupported(other, &format!("{field:?}"))),
    }
}

fn presence_column(entity: Entity, presence: Presence) -> Result<&'static str> {
    match (entity, presence) {
        (Entity::Positions, Presence::ClosedAt) => Ok("closed_at"),
        (Entity::Positions, Presence::Pnl) => Ok("pnl"),
        (Entity::Positions, Presence::TradeId) => Ok("ostium_trade_id"),
        (Entity::Deployments, Presence::SafeWallet) => Ok("safe_wallet"),
        (other, presence) => Err(unsupported(other, &format!("{presence:?}"))),
    }
}

/// Append `filter` as ` AND ...` clauses; `prefix` qualifies every column
fn push_filter(
    qb: &mut QueryBuilder<'static, Postgres>,
    entity: Entity,
    prefix: &str,
    filter: &LedgerFilter,
) -> Result<()> {
    if let Some(status) = &filter.status {
        let column = status_column(entity)?;
        qb.push(format!(" AND {prefix}{column}::text = "))
            .push_bind(status.clone());
    }

    if let Some(venue) = filter.venue {
        if entity == Entity::Deployments {
            // deployments inherit the venue of their agent
            qb.push(format!(
                " AND {prefix}agent_id IN (SELECT id FROM agents WHERE venue::text = "
            ))
            .push_bind(venue.as_str())
            .push(")");
        } else {
            let column = venue_column(entity)?;
            qb.push(format!(" AND {prefix}{column}::text = "))
                .push_bind(venue.as_str());
        }
    }

    if let Some(range) = &filter.range {
        let column = time_column(entity, range.field)?;
        if let Some(since) = range.since {
            qb.push(format!(" AND {prefix}{column} >= ")).push_bind(since);
        }
        if let Some(until) = range.until {
            qb.push(format!(" AND {prefix}{column} < ")).push_bind(until);
        }
    }

    for presence in &filter.require {
        let column = presence_column(entity, *presence)?;
        qb.push(format!(" AND {prefix}{column} IS NOT NULL"));
        if *presence == Presence::SafeWallet {
            qb.push(format!(" AND {prefix}{column} <> ''"));
        }
    }

    Ok(())
}

fn count_query(entity: Entity, filter: &LedgerFilter) -> Result<QueryBuilder<'static, Postgres>> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT COUNT(*)::BIGINT AS total FROM {} WHERE 1=1",
        table_name(entity)
    ));
    push_filter(&mut qb, entity, "", filter)?;
    Ok(qb)
}

fn sum_query(
    entity: Entity,
    field: SumField,
    filter: &LedgerFilter,
) -> Result<QueryBuilder<'static, Postgres>> {
    let column = match (entity, field) {
        (Entity::Positions, SumField::Pnl) => "pnl",
        (other, field) => return Err(unsupported(other, &format!("{field:?}"))),
    };
    let mut qb = QueryBuilder::new(format!(
        "SELECT SUM({column}) AS total FROM {} WHERE 1=1",
        table_name(entity)
    ));
    push_filter(&mut qb, entity, "", filter)?;
    Ok(qb)
}

fn deployments_query(filter: &LedgerFilter) -> Result<QueryBuilder<'static, Postgres>> {
    let mut qb = QueryBuilder::new(
        r#"
        SELECT
            id::text AS id,
            agent_id::text AS agent_id,
            user_wallet,
            safe_wallet,
            status::text AS status,
            sub_started_at::timestamptz AS sub_started_at,
            COALESCE(is_testnet, false) AS is_testnet
        FROM agent_deployments
        WHERE 1=1
        "#,
    );
    push_filter(&mut qb, Entity::Deployments, "", filter)?;
    qb.push(" ORDER BY sub_started_at ASC");
    Ok(qb)
}

fn positions_query(filter: &LedgerFilter) -> Result<QueryBuilder<'static, Postgres>> {
    let mut qb = QueryBuilder::new(
        r#"
        SELECT
            p.id::text AS id,
            COALESCE(p.deployment_id::text, '') AS deployment_id,
            p.venue::text AS venue,
            p.status::text AS status,
            p.pnl,
            p.opened_at::timestamptz AS opened_at,
            p.closed_at::timestamptz AS closed_at,
            p.ostium_trade_id::text AS trade_id,
            COALESCE(d.is_testnet, false) AS is_testnet
        FROM positions p
        LEFT JOIN agent_deployments d ON d.id = p.deployment_id
        WHERE 1=1
        "#,
    );
    push_filter(&mut qb, Entity::Positions, "p.", filter)?;
    qb.push(" ORDER BY p.opened_at ASC");
    Ok(qb)
}

fn signals_query(filter: &LedgerFilter) -> Result<QueryBuilder<'static, Postgres>> {
    let mut qb = QueryBuilder::new(
        r#"
        SELECT
            id::text AS id,
            agent_id::text AS agent_id,
            venue::text AS venue,
            created_at::timestamptz AS created_at
        FROM signals
        WHERE 1=1
        "#,
    );
    push_filter(&mut qb, Entity::Signals, "", filter)?;
    qb.push(" ORDER BY created_at ASC");
    Ok(qb)
}

fn deployment_row(row: &PgRow) -> Result<DeploymentRecord> {
    Ok(DeploymentRecord {
        id: row.try_get("id")?,
        agent_id: row.try_get("agent_id")?,
        user_wallet: row.try_get("user_wallet")?,
        safe_wallet: row.try_get("safe_wallet")?,
        status: row.try_get("status")?,
        sub_started_at: row.try_get("sub_started_at")?,
        is_testnet: row.try_get("is_testnet")?,
    })
}

fn position_row(row: &PgRow) -> Result<PositionRecord> {
    Ok(PositionRecord {
        id: row.try_get("id")?,
        deployment_id: row.try_get("deployment_id")?,
        venue: row.try_get("venue")?,
        status: row.try_get("status")?,
        pnl: row.try_get("pnl")?,
        opened_at: row.try_get("opened_at")?,
        closed_at: row.try_get("closed_at")?,
        trade_id: row.try_get("trade_id")?,
        is_testnet: row.try_get("is_testnet")?,
    })
}

#[async_trait]
impl Ledger for PostgresStore {
    #[instrument(skip(self))]
    async fn count(&self, entity: Entity, filter: &LedgerFilter) -> Result<i64> {
        let row = count_query(entity, filter)?
            .build()
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    #[instrument(skip(self))]
    async fn sum(
        &self,
        entity: Entity,
        field: SumField,
        filter: &LedgerFilter,
    ) -> Result<Option<Decimal>> {
        let row = sum_query(entity, field, filter)?
            .build()
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    #[instrument(skip(self))]
    async fn list_agents(&self) -> Result<Vec<AgentRecord>> {
        let agents_fut = sqlx::query(
            r#"
            SELECT
                id::text AS id,
                name,
                venue::text AS venue,
                creator_wallet,
                profit_receiver_address,
                status::text AS status,
                apr_30d::float8 AS apr_30d,
                apr_90d::float8 AS apr_90d,
                sharpe_30d::float8 AS sharpe_30d
            FROM agents
            ORDER BY apr_30d DESC NULLS LAST
            "#,
        )
        .fetch_all(&self.pool);
        let deployments_fut = sqlx::query(
            "SELECT id::text AS id, agent_id::text AS agent_id, status::text AS status FROM agent_deployments",
        )
        .fetch_all(&self.pool);
        let positions_fut = sqlx::query(
            "SELECT deployment_id::text AS deployment_id, status::text AS status, pnl FROM positions",
        )
        .fetch_all(&self.pool);
        let signals_fut = sqlx::query(
            "SELECT agent_id::text AS agent_id, COUNT(*)::BIGINT AS total FROM signals GROUP BY agent_id",
        )
        .fetch_all(&self.pool);

        let (agent_rows, deployment_rows, position_rows, signal_rows) =
            tokio::try_join!(agents_fut, deployments_fut, positions_fut, signals_fut)?;

        let mut positions: HashMap<String, Vec<PositionSummary>> = HashMap::new();
        for row in &position_rows {
            let deployment_id: Option<String> = row.try_get("deployment_id")?;
            let Some(deployment_id) = deployment_id else {
                continue;
            };
            positions.entry(deployment_id).or_default().push(PositionSummary {
                status: row.try_get("status")?,
                pnl: row.try_get("pnl")?,
            });
        }

        let mut deployments: HashMap<String, Vec<DeploymentSummary>> = HashMap::new();
        for row in &deployment_rows {
            let id: String = row.try_get("id")?;
            let agent_id: String = row.try_get("agent_id")?;
            deployments.entry(agent_id).or_default().push(DeploymentSummary {
                positions: positions.remove(&id).unwrap_or_default(),
                id,
                status: row.try_get("status")?,
            });
        }

        let mut signal_counts: HashMap<String, i64> = HashMap::new();
        for row in &signal_rows {
            signal_counts.insert(row.try_get("agent_id")?, row.try_get("total")?);
        }

        let mut agents = Vec::with_capacity(agent_rows.len());
        for row in &agent_rows {
            let id: String = row.try_get("id")?;
            agents.push(AgentRecord {
                name: row.try_get("name")?,
                venue: row.try_get("venue")?,
                creator_wallet: row.try_get("creator_wallet")?,
                profit_receiver_address: row.try_get("profit_receiver_address")?,
                status: row.try_get("status")?,
                apr_30d: row.try_get("apr_30d")?,
                apr_90d: row.try_get("apr_90d")?,
                sharpe_30d: row.try_get("sharpe_30d")?,
                deployments: deployments.remove(&id).unwrap_or_default(),
                signal_count: signal_counts.get(&id).copied().unwrap_or(0),
                id,
            });
        }

        debug!(agents = agents.len(), "Loaded agents");
        Ok(agents)
    }

    #[instrument(skip(self))]
    async fn list_deployments(&self, filter: &LedgerFilter) -> Result<Vec<DeploymentRecord>> {
        let rows = deployments_query(filter)?
            .build()
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(deployment_row).collect()
    }

    #[instrument(skip(self))]
    async fn list_positions(&self, filter: &LedgerFilter) -> Result<Vec<PositionRecord>> {
        let rows = positions_query(filter)?
            .build()
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(position_row).collect()
    }

    #[instrument(skip(self))]
    async fn list_signals(&self, filter: &LedgerFilter) -> Result<Vec<SignalRecord>> {
        let rows = signals_query(filter)?
            .build()
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| -> Result<SignalRecord> {
                Ok(SignalRecord {
                    id: row.try_get("id")?,
                    agent_id: row.try_get("agent_id")?,
                    venue: row.try_get("venue")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn list_user_agent_addresses(&self) -> Result<Vec<UserAgentAddressRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT
                user_wallet,
                hyperliquid_agent_address,
                ostium_agent_address,
                created_at::timestamptz AS created_at
            FROM user_agent_addresses
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<UserAgentAddressRecord> {
                Ok(UserAgentAddressRecord {
                    user_wallet: row.try_get("user_wallet")?,
                    hyperliquid_agent_address: row.try_get("hyperliquid_agent_address")?,
                    ostium_agent_address: row.try_get("ostium_agent_address")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn list_audit_logs(&self, limit: i64) -> Result<Vec<AuditLogRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT
                event_name,
                subject_type,
                payload,
                occurred_at::timestamptz AS occurred_at
            FROM audit_logs
            ORDER BY occurred_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<AuditLogRecord> {
                Ok(AuditLogRecord {
                    event_name: row.try_get("event_name")?,
                    subject_type: row.try_get("subject_type")?,
                    payload: row.try_get("payload")?,
                    occurred_at: row.try_get("occurred_at")?,
                })
            })
            .collect()
    }
}
