use crate::storage::repository::{HistoryPoint, PriceRepository};
use log::info;
use sea_orm::{ConnectionTrait, DbErr};

/// 历史净值的内存批次
///
/// 达到 `batch_size` 时由编排器内联刷新，运行结束时再刷新一次余量；
/// 每次写入按 `chunk_size` 切块。
pub struct HistoryWriter {
    batch: Vec<HistoryPoint>,
    batch_size: usize,
    chunk_size: usize,
    inserted: u64,
    flushed: u64,
}

impl HistoryWriter {
    pub fn new(batch_size: usize, chunk_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch: Vec::with_capacity(batch_size),
            batch_size,
            chunk_size: chunk_size.max(1),
            inserted: 0,
            flushed: 0,
        }
    }

    pub fn push(&mut self, point: HistoryPoint) {
        self.batch.push(point);
    }

    pub fn is_full(&self) -> bool {
        self.batch.len() >= self.batch_size
    }

    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// 实际新插入的行数（重复行不计）
    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    pub async fn push_and_flush_if_full<C: ConnectionTrait>(
        &mut self,
        db: &C,
        point: HistoryPoint,
    ) -> Result<(), DbErr> {
        self.push(point);
        if self.is_full() {
            self.flush(db).await?;
        }
        Ok(())
    }

    pub async fn flush<C: ConnectionTrait>(&mut self, db: &C) -> Result<u64, DbErr> {
        if self.batch.is_empty() {
            return Ok(0);
        }
        let mut inserted = 0u64;
        for chunk in self.batch.chunks(self.chunk_size) {
            inserted += PriceRepository::insert_history_ignoring_duplicates(db, chunk).await?;
        }
        self.flushed += self.batch.len() as u64;
        info!(
            "历史净值刷新: 批量 {} 条，新增 {} 条 (累计提交 {})",
            self.batch.len(),
            inserted,
            self.flushed
        );
        self.batch.clear();
        self.inserted += inserted;
        Ok(inserted)
    }
}
