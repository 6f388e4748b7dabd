//! MSSQL source reader implementation.
//!
//! Implements the `SourceReader` trait for SQL Server using Tiberius with
//! bb8 connection pooling. Each table is read by one streaming SELECT.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use futures::TryStreamExt;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Query, Row};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SourceConfig;
use crate::core::{
    Batch, ColumnEntry, SourceFactory, SourceReader, SqlNullType, SqlValue, Table, TableEntry,
    TableKind,
};
use crate::error::{DumpError, Result};

/// Maximum TDS packet size (32767 bytes, ~32KB).
const TDS_MAX_PACKET_SIZE: u32 = 32767;

/// Connection acquisition timeout from pool (30 seconds).
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle connection timeout (5 minutes).
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// TCP keepalive interval (30 seconds).
const TCP_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Batches buffered between the reader task and the exporter.
const CURSOR_BUFFER: usize = 4;

/// Connection manager for bb8 pool with Tiberius.
#[derive(Clone)]
pub struct TiberiusConnectionManager {
    config: SourceConfig,
}

impl TiberiusConnectionManager {
    fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    fn build_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.config.host);
        config.port(self.config.port);
        config.database(&self.config.database);
        config.authentication(AuthMethod::sql_server(
            &self.config.user,
            &self.config.password,
        ));

        if self.config.encrypt {
            if self.config.trust_server_cert {
                config.trust_cert();
            }
            config.encryption(EncryptionLevel::Required);
        } else {
            config.encryption(EncryptionLevel::NotSupported);
        }

        config.packet_size(TDS_MAX_PACKET_SIZE);
        config
    }
}

#[async_trait]
impl bb8::ManageConnection for TiberiusConnectionManager {
    type Connection = Client<Compat<TcpStream>>;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let config = self.build_config();
        let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
            tiberius::error::Error::Io {
                kind: e.kind(),
                message: e.to_string(),
            }
        })?;
        tcp.set_nodelay(true).ok();

        let keepalive = socket2::TcpKeepalive::new()
            .with_time(TCP_KEEPALIVE_INTERVAL)
            .with_interval(TCP_KEEPALIVE_INTERVAL);
        if let Err(e) = socket2::SockRef::from(&tcp).set_tcp_keepalive(&keepalive) {
            warn!("Failed to set TCP keepalive on MSSQL connection: {}", e);
        }

        Client::connect(config, tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// MSSQL source reader.
pub struct MssqlReader {
    pool: Pool<TiberiusConnectionManager>,
}

impl MssqlReader {
    /// Create a new MSSQL reader from configuration.
    pub async fn new(config: SourceConfig) -> Result<Self> {
        let pool_size = config.pool_size;
        Self::with_pool_size(config, pool_size).await
    }

    /// Create a new MSSQL reader with specified pool size.
    pub async fn with_pool_size(config: SourceConfig, max_size: u32) -> Result<Self> {
        let manager = TiberiusConnectionManager::new(config.clone());
        let pool = Pool::builder()
            .max_size(max_size.max(1))
            .connection_timeout(POOL_CONNECTION_TIMEOUT)
            .idle_timeout(Some(POOL_IDLE_TIMEOUT))
            .test_on_check_out(true)
            .build(manager)
            .await
            .map_err(|e| DumpError::pool(e, "creating MSSQL connection pool"))?;

        // Test connection
        {
            let mut conn = pool
                .get()
                .await
                .map_err(|e| DumpError::pool(e, "testing MSSQL connection"))?;
            conn.simple_query("SELECT 1").await?.into_row().await?;
        }

        info!(
            "Connected to MSSQL: {}:{}/{} (pool_size={})",
            config.host, config.port, config.database, max_size
        );

        Ok(Self { pool })
    }

    /// Get a pooled connection.
    async fn get_client(&self) -> Result<PooledConnection<'_, TiberiusConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| DumpError::pool(e, "getting MSSQL connection from pool"))
    }
}

#[async_trait]
impl SourceReader for MssqlReader {
    async fn list_tables(&self) -> Result<Vec<TableEntry>> {
        let mut client = self.get_client().await?;

        let query = r#"
            SELECT
                t.TABLE_SCHEMA,
                t.TABLE_NAME,
                t.TABLE_TYPE,
                CAST(ISNULL(OBJECTPROPERTY(
                    OBJECT_ID(QUOTENAME(t.TABLE_SCHEMA) + '.' + QUOTENAME(t.TABLE_NAME)),
                    'IsMSShipped'), 0) AS INT)
            FROM INFORMATION_SCHEMA.TABLES t
            ORDER BY t.TABLE_SCHEMA, t.TABLE_NAME
        "#;

        let rows = client
            .simple_query(query)
            .await?
            .into_first_result()
            .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let schema = row.try_get::<&str, _>(0)?.unwrap_or_default().to_string();
            let name = row.try_get::<&str, _>(1)?.unwrap_or_default().to_string();
            let table_type = row.try_get::<&str, _>(2)?.unwrap_or_default();
            let shipped = row.try_get::<i32, _>(3)?.unwrap_or(0) == 1;

            let kind = if shipped {
                TableKind::System
            } else if table_type.eq_ignore_ascii_case("BASE TABLE") {
                TableKind::BaseTable
            } else {
                TableKind::View
            };
            tables.push(TableEntry { schema, name, kind });
        }

        debug!("MSSQL catalog lists {} tables and views", tables.len());
        Ok(tables)
    }

    async fn list_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnEntry>> {
        let mut client = self.get_client().await?;

        let query = r#"
            SELECT
                COLUMN_NAME,
                DATA_TYPE,
                CAST(ISNULL(CHARACTER_MAXIMUM_LENGTH, 0) AS INT),
                ORDINAL_POSITION
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2
            ORDER BY ORDINAL_POSITION
        "#;

        let mut query = Query::new(query);
        query.bind(schema);
        query.bind(table);

        let rows = query.query(&mut client).await?.into_first_result().await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            columns.push(ColumnEntry {
                name: row.try_get::<&str, _>(0)?.unwrap_or_default().to_string(),
                data_type: row.try_get::<&str, _>(1)?.unwrap_or_default().to_string(),
                max_length: row.try_get::<i32, _>(2)?.unwrap_or(0),
                ordinal_pos: row.try_get::<i32, _>(3)?.unwrap_or(0),
            });
        }
        Ok(columns)
    }

    fn read_table(&self, table: &Table, fetch_size: usize) -> mpsc::Receiver<Result<Batch>> {
        let (tx, rx) = mpsc::channel(CURSOR_BUFFER);
        let pool = self.pool.clone();
        let sql = table.select_query();
        let col_types: Vec<String> = table.columns.iter().map(|c| c.data_type.clone()).collect();
        let name = table.full_name();

        tokio::spawn(async move {
            if let Err(e) = read_table_internal(pool, &sql, &col_types, fetch_size, &tx).await {
                let _ = tx
                    .send(Err(DumpError::table(name, e.to_string())))
                    .await;
            }
        });

        rx
    }

    fn db_type(&self) -> &str {
        "mssql"
    }

    async fn close(&self) {
        // bb8 pool handles cleanup automatically
    }
}

/// Stream every row of one SELECT into the channel in `fetch_size` batches.
async fn read_table_internal(
    pool: Pool<TiberiusConnectionManager>,
    sql: &str,
    col_types: &[String],
    fetch_size: usize,
    tx: &mpsc::Sender<Result<Batch>>,
) -> Result<()> {
    let mut client = pool
        .get()
        .await
        .map_err(|e| DumpError::pool(e, "getting connection for read_table"))?;

    debug!("Reading: {}", sql);
    let mut stream = client.simple_query(sql).await?.into_row_stream();
    let mut rows = Vec::with_capacity(fetch_size);

    while let Some(row) = stream.try_next().await? {
        let mut values = Vec::with_capacity(col_types.len());
        for (idx, data_type) in col_types.iter().enumerate() {
            values.push(convert_row_value(&row, idx, data_type)?);
        }
        rows.push(values);

        if rows.len() >= fetch_size {
            let batch = Batch::new(std::mem::replace(&mut rows, Vec::with_capacity(fetch_size)));
            if tx.send(Ok(batch)).await.is_err() {
                // Consumer gone (failure or cancel); stop reading.
                return Ok(());
            }
        }
    }

    if !rows.is_empty() {
        let _ = tx.send(Ok(Batch::new(rows))).await;
    }
    Ok(())
}

/// Convert a row value to SqlValue based on the column type.
///
/// A missing value (`None`) is the driver's was-null signal.
fn convert_row_value(row: &Row, idx: usize, data_type: &str) -> Result<SqlValue<'static>> {
    let dt = data_type.to_lowercase();

    let value = match dt.as_str() {
        "bit" => row
            .try_get::<bool, _>(idx)?
            .map(SqlValue::Bool)
            .unwrap_or(SqlValue::Null(SqlNullType::Bool)),
        "tinyint" => row
            .try_get::<u8, _>(idx)?
            .map(|v| SqlValue::I16(v as i16))
            .unwrap_or(SqlValue::Null(SqlNullType::I16)),
        "smallint" => row
            .try_get::<i16, _>(idx)?
            .map(SqlValue::I16)
            .unwrap_or(SqlValue::Null(SqlNullType::I16)),
        "int" => row
            .try_get::<i32, _>(idx)?
            .map(SqlValue::I32)
            .unwrap_or(SqlValue::Null(SqlNullType::I32)),
        "bigint" => row
            .try_get::<i64, _>(idx)?
            .map(SqlValue::I64)
            .unwrap_or(SqlValue::Null(SqlNullType::I64)),
        "real" => row
            .try_get::<f32, _>(idx)?
            .map(SqlValue::F32)
            .unwrap_or(SqlValue::Null(SqlNullType::F32)),
        "float" => row
            .try_get::<f64, _>(idx)?
            .map(SqlValue::F64)
            .unwrap_or(SqlValue::Null(SqlNullType::F64)),
        "uniqueidentifier" => row
            .try_get::<Uuid, _>(idx)?
            .map(SqlValue::Uuid)
            .unwrap_or(SqlValue::Null(SqlNullType::Uuid)),
        "datetime" | "datetime2" | "smalldatetime" => row
            .try_get::<NaiveDateTime, _>(idx)?
            .map(SqlValue::DateTime)
            .unwrap_or(SqlValue::Null(SqlNullType::DateTime)),
        "datetimeoffset" => row
            .try_get::<DateTime<FixedOffset>, _>(idx)?
            .map(SqlValue::DateTimeOffset)
            .unwrap_or(SqlValue::Null(SqlNullType::DateTimeOffset)),
        "date" => row
            .try_get::<NaiveDate, _>(idx)?
            .map(SqlValue::Date)
            .unwrap_or(SqlValue::Null(SqlNullType::Date)),
        "time" => row
            .try_get::<NaiveTime, _>(idx)?
            .map(SqlValue::Time)
            .unwrap_or(SqlValue::Null(SqlNullType::Time)),
        "binary" | "varbinary" | "image" | "timestamp" | "rowversion" => row
            .try_get::<&[u8], _>(idx)?
            .map(|v| SqlValue::Bytes(Cow::Owned(v.to_vec())))
            .unwrap_or(SqlValue::Null(SqlNullType::Bytes)),
        // money arrives as DECIMAL(19,4) through Column::select_expr
        "decimal" | "numeric" | "money" | "smallmoney" => row
            .try_get::<rust_decimal::Decimal, _>(idx)?
            .map(SqlValue::Decimal)
            .unwrap_or(SqlValue::Null(SqlNullType::Decimal)),
        _ => {
            // Default: treat as string
            row.try_get::<&str, _>(idx)?
                .map(|s| SqlValue::Text(Cow::Owned(s.to_string())))
                .unwrap_or(SqlValue::Null(SqlNullType::String))
        }
    };
    Ok(value)
}

/// Opens pooled [`MssqlReader`]s from the source configuration.
pub struct MssqlFactory {
    config: SourceConfig,
}

impl MssqlFactory {
    /// Create a factory for `config`.
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SourceFactory for MssqlFactory {
    async fn connect(&self) -> Result<Arc<dyn SourceReader>> {
        let reader = MssqlReader::new(self.config.clone()).await?;
        let reader: Arc<dyn SourceReader> = Arc::new(reader);
        Ok(reader)
    }
}
