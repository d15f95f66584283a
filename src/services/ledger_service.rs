use crate::entities::{
    CreditReferenceType, CreditTransactionType, credit_account_entity as accounts,
    credit_transaction_entity as transactions,
};
use crate::error::{AppError, AppResult};
use crate::middlewares::Caller;
use crate::models::{
    AccountVerificationResponse, CreditBalanceResponse, CreditTransactionResponse, PageQuery,
    PaginatedResponse, PaginationParams,
};
use chrono::Utc;
use sea_orm::sea_query::{OnConflict, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

/// 一条待写入的流水
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub user_id: i64,
    /// 正数入账, 负数扣款
    pub amount_cents: i64,
    pub reference_type: Option<CreditReferenceType>,
    pub reference_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_by: Option<i64>,
}

/// 余额账本
///
/// 入账/扣款函数接收调用方的连接 (通常是事务), 与调用方的状态变更同事务提交。
#[derive(Clone)]
pub struct LedgerService {
    pool: DatabaseConnection,
}

impl LedgerService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 扣款; 余额不足返回 LedgerFailure, 不写任何数据
    pub async fn debit<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        amount_cents: i64,
        reference_type: CreditReferenceType,
        reference_id: Uuid,
        description: &str,
    ) -> AppResult<transactions::Model> {
        if amount_cents <= 0 {
            return Err(AppError::ValidationError(
                "Debit amount must be positive".into(),
            ));
        }
        self.apply(
            conn,
            LedgerEntry {
                user_id,
                amount_cents: -amount_cents,
                reference_type: Some(reference_type),
                reference_id: Some(reference_id),
                description: Some(description.to_string()),
                created_by: None,
            },
        )
        .await
    }

    /// 入账; 同一业务引用重复入账会触发唯一约束 -> Conflict
    pub async fn credit<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        amount_cents: i64,
        reference_type: CreditReferenceType,
        reference_id: Uuid,
        description: &str,
    ) -> AppResult<transactions::Model> {
        if amount_cents < 0 {
            return Err(AppError::ValidationError(
                "Credit amount must not be negative".into(),
            ));
        }
        self.apply(
            conn,
            LedgerEntry {
                user_id,
                amount_cents,
                reference_type: Some(reference_type),
                reference_id: Some(reference_id),
                description: Some(description.to_string()),
                created_by: None,
            },
        )
        .await
    }

    /// 锁定账户行 -> 计算新余额 -> 更新账户 -> 追加流水
    async fn apply<C: ConnectionTrait>(
        &self,
        conn: &C,
        entry: LedgerEntry,
    ) -> AppResult<transactions::Model> {
        let account = self.lock_account(conn, entry.user_id).await?;

        let new_balance = account
            .balance_cents
            .checked_add(entry.amount_cents)
            .ok_or_else(|| AppError::LedgerFailure("Balance overflow".into()))?;
        if new_balance < 0 {
            log::warn!(
                "Insufficient credits: user={} balance={} amount={}",
                entry.user_id,
                account.balance_cents,
                entry.amount_cents
            );
            return Err(AppError::LedgerFailure("Insufficient credit balance".into()));
        }

        let now = Utc::now();
        let sequence = account.next_sequence;
        let mut am = account.into_active_model();
        am.balance_cents = Set(new_balance);
        am.next_sequence = Set(sequence + 1);
        am.updated_at = Set(now);
        am.update(conn).await?;

        let transaction_type = if entry.amount_cents < 0 {
            CreditTransactionType::Debit
        } else {
            CreditTransactionType::Credit
        };

        let tx = transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(entry.user_id),
            sequence: Set(sequence),
            transaction_type: Set(transaction_type),
            amount_cents: Set(entry.amount_cents),
            balance_after_cents: Set(new_balance),
            reference_type: Set(entry.reference_type),
            reference_id: Set(entry.reference_id),
            description: Set(entry.description),
            created_by: Set(entry.created_by),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;

        Ok(tx)
    }

    /// 账户不存在时插入 (DO NOTHING), 然后加行锁读取
    async fn lock_account<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
    ) -> AppResult<accounts::Model> {
        let now = Utc::now();
        let insert = Query::insert()
            .into_table(accounts::Entity)
            .columns([
                accounts::Column::Id,
                accounts::Column::UserId,
                accounts::Column::BalanceCents,
                accounts::Column::NextSequence,
                accounts::Column::CreatedAt,
                accounts::Column::UpdatedAt,
            ])
            .values_panic([
                Uuid::new_v4().into(),
                user_id.into(),
                0i64.into(),
                1i64.into(),
                now.into(),
                now.into(),
            ])
            .on_conflict(
                OnConflict::column(accounts::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .to_owned();
        let stmt = conn.get_database_backend().build(&insert);
        conn.execute(stmt).await?;

        accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .lock_exclusive()
            .one(conn)
            .await?
            .ok_or_else(|| AppError::InternalError("Credit account missing after upsert".into()))
    }

    /// 当前余额 (无账户视为 0)
    pub async fn balance(&self, user_id: i64) -> AppResult<CreditBalanceResponse> {
        let balance_cents = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .map(|a| a.balance_cents)
            .unwrap_or(0);
        Ok(CreditBalanceResponse {
            user_id,
            balance_cents,
        })
    }

    /// 流水分页 (按序号倒序)
    pub async fn transactions(
        &self,
        caller: &Caller,
        user_id: i64,
        query: &PageQuery,
    ) -> AppResult<PaginatedResponse<CreditTransactionResponse>> {
        caller.require_owner_or_admin(user_id)?;
        let params = PaginationParams::from(query);

        let base = transactions::Entity::find().filter(transactions::Column::UserId.eq(user_id));
        let total = base.clone().count(&self.pool).await?;
        let items = base
            .order_by_desc(transactions::Column::Sequence)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::new(
            items.into_iter().map(Into::into).collect(),
            params,
            total,
        ))
    }

    /// 管理员调整余额
    pub async fn adjust_balance(
        &self,
        caller: &Caller,
        user_id: i64,
        amount_cents: i64,
        note: &str,
    ) -> AppResult<CreditTransactionResponse> {
        caller.require_admin()?;
        if amount_cents == 0 {
            return Err(AppError::ValidationError(
                "Adjustment amount must not be zero".into(),
            ));
        }
        if note.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Adjustment note is required".into(),
            ));
        }

        let txn = self.pool.begin().await?;
        let tx = self
            .apply(
                &txn,
                LedgerEntry {
                    user_id,
                    amount_cents,
                    reference_type: Some(CreditReferenceType::Adjustment),
                    reference_id: None,
                    description: Some(note.trim().to_string()),
                    created_by: Some(caller.user_id),
                },
            )
            .await?;
        txn.commit().await?;

        log::info!(
            "Credit adjustment: user={user_id} amount={amount_cents} by={}",
            caller.user_id
        );
        Ok(tx.into())
    }

    /// 按序号重放流水, 校验前缀和与账户余额一致
    pub async fn verify_account(&self, user_id: i64) -> AppResult<AccountVerificationResponse> {
        let balance_cents = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .map(|a| a.balance_cents)
            .unwrap_or(0);

        let items = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_asc(transactions::Column::Sequence)
            .all(&self.pool)
            .await?;

        let (reconstructed_cents, first_mismatch_sequence) = replay(&items);
        let consistent = first_mismatch_sequence.is_none() && reconstructed_cents == balance_cents;
        if !consistent {
            log::warn!(
                "Ledger mismatch for user {user_id}: balance={balance_cents} replayed={reconstructed_cents}"
            );
        }

        Ok(AccountVerificationResponse {
            user_id,
            balance_cents,
            reconstructed_cents,
            transaction_count: items.len() as u64,
            consistent,
            first_mismatch_sequence,
        })
    }
}

/// 重放流水: 返回前缀和以及第一条序号不连续、余额为负或 balance_after 不符的流水序号
fn replay(items: &[transactions::Model]) -> (i64, Option<i64>) {
    let mut running = 0i64;
    let mut mismatch = None;
    for (idx, tx) in items.iter().enumerate() {
        running += tx.amount_cents;
        let expected_sequence = idx as i64 + 1;
        if mismatch.is_none()
            && (tx.sequence != expected_sequence
                || tx.balance_after_cents != running
                || running < 0)
        {
            mismatch = Some(tx.sequence);
        }
    }
    (running, mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_db;

    fn tx(sequence: i64, amount: i64, after: i64) -> transactions::Model {
        transactions::Model {
            id: Uuid::new_v4(),
            user_id: 1,
            sequence,
            transaction_type: if amount < 0 {
                CreditTransactionType::Debit
            } else {
                CreditTransactionType::Credit
            },
            amount_cents: amount,
            balance_after_cents: after,
            reference_type: None,
            reference_id: None,
            description: None,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn replay_detects_bad_running_balance() {
        let ok = vec![tx(1, 500, 500), tx(2, -200, 300)];
        assert_eq!(replay(&ok), (300, None));

        let bad = vec![tx(1, 500, 500), tx(2, -200, 250)];
        assert_eq!(replay(&bad), (300, Some(2)));

        let gap = vec![tx(1, 500, 500), tx(3, 100, 600)];
        assert_eq!(replay(&gap).1, Some(3));
    }

    #[tokio::test]
    async fn debit_never_drives_balance_negative() {
        let db = setup_db().await;
        let ledger = LedgerService::new(db.clone());
        let admin = Caller::admin(99);

        ledger.adjust_balance(&admin, 1, 1_000, "top up").await.unwrap();

        let txn = db.begin().await.unwrap();
        let err = ledger
            .debit(&txn, 1, 1_500, CreditReferenceType::TicketPurchase, Uuid::new_v4(), "buy")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LedgerFailure(_)));
        drop(txn);

        assert_eq!(ledger.balance(1).await.unwrap().balance_cents, 1_000);
    }

    #[tokio::test]
    async fn prefix_sum_reconstructs_balance() {
        let db = setup_db().await;
        let ledger = LedgerService::new(db.clone());
        let admin = Caller::admin(99);

        ledger.adjust_balance(&admin, 7, 2_000, "top up").await.unwrap();
        let txn = db.begin().await.unwrap();
        ledger
            .debit(&txn, 7, 750, CreditReferenceType::TicketPurchase, Uuid::new_v4(), "buy")
            .await
            .unwrap();
        ledger
            .credit(&txn, 7, 300, CreditReferenceType::PrizeClaim, Uuid::new_v4(), "prize")
            .await
            .unwrap();
        txn.commit().await.unwrap();

        let report = ledger.verify_account(7).await.unwrap();
        assert!(report.consistent);
        assert_eq!(report.balance_cents, 1_550);
        assert_eq!(report.reconstructed_cents, 1_550);
        assert_eq!(report.transaction_count, 3);

        let page = ledger
            .transactions(&Caller::user(7), 7, &PageQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.data[0].sequence, 3);
    }

    #[tokio::test]
    async fn same_reference_cannot_be_credited_twice() {
        let db = setup_db().await;
        let ledger = LedgerService::new(db.clone());
        let reference = Uuid::new_v4();

        let txn = db.begin().await.unwrap();
        ledger
            .credit(&txn, 3, 100, CreditReferenceType::PrizeClaim, reference, "prize")
            .await
            .unwrap();
        txn.commit().await.unwrap();

        let txn = db.begin().await.unwrap();
        let err = ledger
            .credit(&txn, 3, 100, CreditReferenceType::PrizeClaim, reference, "prize")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        drop(txn);

        assert_eq!(ledger.balance(3).await.unwrap().balance_cents, 100);
    }

    #[tokio::test]
    async fn only_admin_can_adjust_and_others_cannot_read_history() {
        let db = setup_db().await;
        let ledger = LedgerService::new(db);

        assert!(matches!(
            ledger.adjust_balance(&Caller::user(1), 1, 100, "x").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            ledger
                .transactions(&Caller::user(2), 1, &PageQuery::default())
                .await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
