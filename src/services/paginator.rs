//! 翻页服务 - 业务能力层
//!
//! 把多种翻页方式统一在一个接口后面：按配置给出的顺序逐个尝试，
//! 只要某个动作之后重新扫描出了未处理过的文档，就认为还有下一页。
//! 所有动作都没有带来新文档时即为到底，这是正常结束而不是错误。

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{Config, PaginationMode};
use crate::driver::{HarvestDriver, PaginationStrategy};
use crate::models::DocumentReference;
use crate::services::enumerator::DocumentEnumerator;
use crate::services::tracker::IdentifierTracker;

/// 一次翻页的结果
#[derive(Debug)]
pub enum Advance {
    /// 翻页后的完整视图（至少包含一个未处理的文档）
    More {
        strategy: PaginationStrategy,
        references: Vec<DocumentReference>,
    },
    /// 已到集合末尾
    Exhausted,
}

pub struct Paginator {
    strategies: Vec<PaginationStrategy>,
    advance_delay: Duration,
}

impl Paginator {
    pub fn new(mode: PaginationMode, advance_delay: Duration) -> Self {
        let strategies = match mode {
            PaginationMode::Auto => {
                vec![PaginationStrategy::Scroll, PaginationStrategy::ControlElement]
            }
            PaginationMode::Scroll => vec![PaginationStrategy::Scroll],
            PaginationMode::Control => vec![PaginationStrategy::ControlElement],
            PaginationMode::Index => Vec::new(),
        };
        Self {
            strategies,
            advance_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.pagination, config.page_advance_delay())
    }

    /// 尝试前进到下一页
    ///
    /// 单个策略出错只记录日志并换下一个策略，不会向上抛出。
    pub async fn advance<D: HarvestDriver + ?Sized>(
        &self,
        driver: &D,
        enumerator: &DocumentEnumerator,
        tracker: &IdentifierTracker,
    ) -> Advance {
        if self.strategies.is_empty() {
            debug!("索引模式：列表已一次性给出，不再翻页");
            return Advance::Exhausted;
        }

        for &strategy in &self.strategies {
            let performed = match driver.advance_page(strategy).await {
                Ok(performed) => performed,
                Err(e) => {
                    warn!("⚠️ 翻页动作 [{}] 失败: {}", strategy, e);
                    continue;
                }
            };
            if !performed {
                debug!("翻页动作 [{}] 没有效果", strategy);
                continue;
            }

            sleep(self.advance_delay).await;

            let references = match enumerator.scan_with_retry(driver).await {
                Ok(references) => references,
                Err(e) => {
                    warn!("⚠️ 翻页 [{}] 后扫描失败: {}", strategy, e);
                    continue;
                }
            };

            let fresh = references
                .iter()
                .filter(|r| !tracker.has(&r.identifier))
                .count();
            if fresh > 0 {
                info!("📄 [{}] 翻页成功，发现 {} 个新文档", strategy, fresh);
                return Advance::More {
                    strategy,
                    references,
                };
            }
            debug!("翻页 [{}] 后没有新文档", strategy);
        }

        info!("🏁 所有翻页方式都没有带来新文档，已到集合末尾");
        Advance::Exhausted
    }
}
