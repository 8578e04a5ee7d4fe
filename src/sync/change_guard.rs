// ==========================================
// 商品目录同步 - 变更守卫
// ==========================================
// 职责: 同步写入期间屏蔽由自身写入引起的行变更通知
// 红线: 任一退出路径（含错误 / panic 展开）都必须清除标志
// 实现: 计数器 + RAII 令牌，嵌套写入序列在最外层结束时才清除
// ==========================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct ChangeGuard {
    depth: Arc<AtomicUsize>,
}

impl ChangeGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否处于同步写入序列中
    pub fn is_active(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }

    /// 进入写入序列，返回的令牌析构时退出
    pub fn enter(&self) -> GuardToken {
        let previous = self.depth.fetch_add(1, Ordering::SeqCst);
        trace!(depth = previous + 1, "变更守卫已进入");
        GuardToken {
            depth: Arc::clone(&self.depth),
        }
    }
}

/// 写入序列令牌
#[derive(Debug)]
#[must_use = "令牌被丢弃时守卫立即退出"]
pub struct GuardToken {
    depth: Arc<AtomicUsize>,
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        let previous = self.depth.fetch_sub(1, Ordering::SeqCst);
        trace!(depth = previous.saturating_sub(1), "变更守卫已退出");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_clears_on_drop() {
        let guard = ChangeGuard::new();
        assert!(!guard.is_active());
        {
            let _token = guard.enter();
            assert!(guard.is_active());
        }
        assert!(!guard.is_active());
    }

    #[test]
    fn test_nested_sequences() {
        let guard = ChangeGuard::new();
        let outer = guard.enter();
        let inner = guard.clone().enter();
        drop(inner);
        assert!(guard.is_active());
        drop(outer);
        assert!(!guard.is_active());
    }

    #[test]
    fn test_cleared_on_error_path() {
        fn failing_sequence(guard: &ChangeGuard) -> Result<(), String> {
            let _token = guard.enter();
            Err("写入失败".to_string())
        }

        let guard = ChangeGuard::new();
        assert!(failing_sequence(&guard).is_err());
        assert!(!guard.is_active());
    }

    #[test]
    fn test_cleared_on_panic() {
        let guard = ChangeGuard::new();
        let cloned = guard.clone();
        let result = std::panic::catch_unwind(move || {
            let _token = cloned.enter();
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(!guard.is_active());
    }
}
