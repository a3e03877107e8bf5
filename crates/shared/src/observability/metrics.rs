//! 校验指标模块
//!
//! 基于 metrics crate 门面记录校验引擎的运行指标。
//! 本模块不安装任何 recorder，未安装时所有记录都是空操作，由宿主程序决定导出方式。

/// 校验轮次总数
pub const VALIDATION_PASSES_TOTAL: &str = "validation_passes_total";
/// 校验轮次耗时
pub const VALIDATION_PASS_DURATION_SECONDS: &str = "validation_pass_duration_seconds";
/// 谓词故障总数
pub const PREDICATE_FAULTS_TOTAL: &str = "predicate_faults_total";
/// 错误变更通知总数
pub const ERRORS_CHANGED_TOTAL: &str = "errors_changed_total";

/// 校验轮次类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// 单属性增量校验
    Incremental,
    /// 全量校验（惰性初始化或显式重新校验）
    Full,
}

impl PassKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incremental => "incremental",
            Self::Full => "full",
        }
    }
}

/// 注册指标描述
///
/// 这些描述会出现在导出端点的 HELP 注释中。
pub fn describe() {
    metrics::describe_counter!(VALIDATION_PASSES_TOTAL, "Total number of validation passes");
    metrics::describe_histogram!(
        VALIDATION_PASS_DURATION_SECONDS,
        "Validation pass duration in seconds"
    );
    metrics::describe_counter!(PREDICATE_FAULTS_TOTAL, "Total number of predicate faults");
    metrics::describe_counter!(
        ERRORS_CHANGED_TOTAL,
        "Total number of errors-changed notifications"
    );
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录一次校验轮次
#[inline]
pub fn record_validation_pass(kind: PassKind, duration_secs: f64) {
    metrics::counter!(VALIDATION_PASSES_TOTAL, "kind" => kind.as_str()).increment(1);
    metrics::histogram!(VALIDATION_PASS_DURATION_SECONDS, "kind" => kind.as_str())
        .record(duration_secs);
}

/// 记录一次谓词故障
#[inline]
pub fn record_predicate_fault(model: &'static str) {
    metrics::counter!(PREDICATE_FAULTS_TOTAL, "model" => model).increment(1);
}

/// 记录一次错误变更通知
#[inline]
pub fn record_errors_changed(model: &'static str) {
    metrics::counter!(ERRORS_CHANGED_TOTAL, "model" => model).increment(1);
}
