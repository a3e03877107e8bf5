//! 规则集合
//!
//! 一个模型类型的所有实例共享同一个 [`RuleCollection`]：规则属于模式层面，
//! 注册或清空会立即影响该类型的每个实例。集合内部使用 `RwLock` 保护，
//! 评估时先对匹配的规则做快照，执行谓词期间不持有锁。

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};
use validation_shared::config::ValidationConfig;
use validation_shared::observability::metrics;

use crate::error::{BoxError, Result, ValidationError};
use crate::key::PropertyKey;
use crate::validatable::Validatable;

type Predicate<T> = dyn Fn(&T) -> std::result::Result<bool, BoxError> + Send + Sync;

/// 校验规则
///
/// 绑定属性键、错误负载和谓词，构造后不可变。谓词返回 `false` 表示规则不满足。
pub struct Rule<T: Validatable> {
    property: T::Key,
    error: T::Error,
    predicate: Box<Predicate<T>>,
}

impl<T: Validatable> Rule<T> {
    pub fn new<F>(property: T::Key, error: T::Error, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::fallible(property, error, move |instance| Ok(predicate(instance)))
    }

    /// 创建可能失败的规则，谓词返回的错误会中断当前校验轮次
    pub fn fallible<F>(property: T::Key, error: T::Error, predicate: F) -> Self
    where
        F: Fn(&T) -> std::result::Result<bool, BoxError> + Send + Sync + 'static,
    {
        Self {
            property,
            error,
            predicate: Box::new(predicate),
        }
    }

    pub fn property(&self) -> &T::Key {
        &self.property
    }

    pub fn error(&self) -> &T::Error {
        &self.error
    }

    /// 对实例执行谓词
    pub fn check(&self, instance: &T) -> std::result::Result<bool, BoxError> {
        (self.predicate)(instance)
    }
}

impl<T: Validatable> fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("property", &self.property)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// 规则集合
///
/// 克隆只复制句柄，所有克隆共享同一组规则。
pub struct RuleCollection<T: Validatable> {
    rules: Arc<RwLock<Vec<Arc<Rule<T>>>>>,
    options: ValidationConfig,
}

impl<T: Validatable> RuleCollection<T> {
    pub fn new() -> Self {
        Self::with_options(ValidationConfig::default())
    }

    pub fn with_options(options: ValidationConfig) -> Self {
        Self {
            rules: Arc::new(RwLock::new(Vec::new())),
            options,
        }
    }

    pub fn options(&self) -> ValidationConfig {
        self.options
    }

    /// 获取当前规则数量
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// 检查集合是否为空
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// 追加规则
    ///
    /// 不校验属性是否真实存在；属性名写错时规则永远不会被评估。
    pub fn add<F>(&self, property: T::Key, error: T::Error, predicate: F)
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.push(Rule::new(property, error, predicate));
    }

    /// 追加可能失败的规则
    pub fn add_fallible<F>(&self, property: T::Key, error: T::Error, predicate: F)
    where
        F: Fn(&T) -> std::result::Result<bool, BoxError> + Send + Sync + 'static,
    {
        self.push(Rule::fallible(property, error, predicate));
    }

    /// 追加已构造的规则
    pub fn push(&self, rule: Rule<T>) {
        let property = rule.property().name().to_string();
        let count = {
            let mut rules = self.rules.write();
            rules.push(Arc::new(rule));
            rules.len()
        };
        debug!(property = %property, rules = count, "规则已注册");
    }

    /// 清空所有规则
    ///
    /// 已初始化实例的错误缓存不会被清除，直到对应属性再次变更或调用重新校验。
    #[instrument(skip(self))]
    pub fn clear(&self) {
        let count = {
            let mut rules = self.rules.write();
            let count = rules.len();
            rules.clear();
            count
        };
        info!("已清空 {} 条规则", count);
    }

    /// 按首次注册顺序返回所有不重复的属性
    pub fn properties(&self) -> Vec<T::Key> {
        let properties: IndexSet<T::Key> = self
            .rules
            .read()
            .iter()
            .map(|rule| rule.property().clone())
            .collect();
        properties.into_iter().collect()
    }

    /// 获取作用于某个属性的规则快照（按注册顺序）
    pub fn rules_for(&self, property: &T::Key) -> Vec<Arc<Rule<T>>> {
        self.rules
            .read()
            .iter()
            .filter(|rule| rule.property() == property)
            .cloned()
            .collect()
    }

    /// 对实例评估某个属性的所有规则
    ///
    /// 按注册顺序收集不满足规则的错误负载。谓词故障立即中断评估并返回错误。
    pub fn apply(&self, instance: &T, property: &T::Key) -> Result<Vec<T::Error>> {
        let mut errors = Vec::new();

        for rule in self.rules_for(property) {
            match rule.check(instance) {
                Ok(true) => {}
                Ok(false) => errors.push(rule.error().clone()),
                Err(source) => {
                    warn!(
                        model = std::any::type_name::<T>(),
                        property = property.name(),
                        error = %source,
                        "谓词执行失败，校验中断"
                    );
                    metrics::record_predicate_fault(std::any::type_name::<T>());
                    return Err(ValidationError::PredicateFault {
                        property: property.name().to_string(),
                        source,
                    });
                }
            }
        }

        Ok(errors)
    }

    /// 获取规则统计信息
    pub fn stats(&self) -> RuleCollectionStats {
        let rules_count = self.len();
        let properties_count = self.properties().len();

        RuleCollectionStats {
            rules_count,
            properties_count,
            avg_rules_per_property: if properties_count > 0 {
                rules_count as f64 / properties_count as f64
            } else {
                0.0
            },
        }
    }
}

impl<T: Validatable> Clone for RuleCollection<T> {
    fn clone(&self) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
            options: self.options,
        }
    }
}

impl<T: Validatable> Default for RuleCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Validatable> fmt::Debug for RuleCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleCollection")
            .field("rules", &self.len())
            .field("options", &self.options)
            .finish()
    }
}

/// 规则集合统计信息
#[derive(Debug, Clone)]
pub struct RuleCollectionStats {
    /// 规则总数
    pub rules_count: usize,
    /// 不重复的属性数
    pub properties_count: usize,
    /// 平均每个属性的规则数
    pub avg_rules_per_property: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ValidationState;

    struct Account {
        name: String,
        balance: i64,
        validation: ValidationState<Account>,
    }

    impl Validatable for Account {
        type Key = &'static str;
        type Error = String;

        fn validation(&self) -> &ValidationState<Self> {
            &self.validation
        }
    }

    fn account(rules: &RuleCollection<Account>, name: &str, balance: i64) -> Account {
        Account {
            name: name.to_string(),
            balance,
            validation: ValidationState::new(rules),
        }
    }

    #[test]
    fn test_add_rule() {
        let rules = RuleCollection::<Account>::new();
        rules.add("name", "name required".to_string(), |a| !a.name.is_empty());

        assert_eq!(rules.len(), 1);
        assert!(!rules.is_empty());
    }

    #[test]
    fn test_apply_collects_failures_in_order() {
        let rules = RuleCollection::<Account>::new();
        rules.add("name", "name required".to_string(), |a| !a.name.is_empty());
        rules.add("balance", "balance negative".to_string(), |a| a.balance >= 0);
        rules.add("name", "name too short".to_string(), |a| a.name.len() >= 3);

        let empty = account(&rules, "", -5);
        assert_eq!(
            rules.apply(&empty, &"name").unwrap(),
            vec!["name required".to_string(), "name too short".to_string()]
        );
        assert_eq!(
            rules.apply(&empty, &"balance").unwrap(),
            vec!["balance negative".to_string()]
        );

        let valid = account(&rules, "alice", 10);
        assert!(rules.apply(&valid, &"name").unwrap().is_empty());
    }

    #[test]
    fn test_apply_unknown_property_is_empty() {
        let rules = RuleCollection::<Account>::new();
        rules.add("name", "name required".to_string(), |a| !a.name.is_empty());

        let empty = account(&rules, "", 0);
        assert!(rules.apply(&empty, &"nickname").unwrap().is_empty());
    }

    #[test]
    fn test_apply_propagates_fault() {
        let rules = RuleCollection::<Account>::new();
        rules.add_fallible("balance", "unreachable".to_string(), |_| {
            Err("ledger unavailable".into())
        });
        rules.add("balance", "never evaluated".to_string(), |_| false);

        let acc = account(&rules, "bob", 1);
        let err = rules.apply(&acc, &"balance").unwrap_err();
        assert_eq!(err.property(), "balance");
    }

    #[test]
    fn test_properties_in_first_registration_order() {
        let rules = RuleCollection::<Account>::new();
        rules.add("balance", "b1".to_string(), |_| true);
        rules.add("name", "n1".to_string(), |_| true);
        rules.add("balance", "b2".to_string(), |_| true);

        assert_eq!(rules.properties(), vec!["balance", "name"]);
    }

    #[test]
    fn test_clear() {
        let rules = RuleCollection::<Account>::new();
        rules.add("name", "n1".to_string(), |_| false);
        rules.add("balance", "b1".to_string(), |_| false);

        rules.clear();

        assert!(rules.is_empty());
        assert!(rules.properties().is_empty());
        let acc = account(&rules, "", 0);
        assert!(rules.apply(&acc, &"name").unwrap().is_empty());
    }

    #[test]
    fn test_clones_share_rules() {
        let rules = RuleCollection::<Account>::new();
        let handle = rules.clone();

        handle.add("name", "n1".to_string(), |_| true);

        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_stats() {
        let rules = RuleCollection::<Account>::new();
        rules.add("name", "n1".to_string(), |_| true);
        rules.add("name", "n2".to_string(), |_| true);
        rules.add("balance", "b1".to_string(), |_| true);
        rules.add("balance", "b2".to_string(), |_| true);

        let stats = rules.stats();

        assert_eq!(stats.rules_count, 4);
        assert_eq!(stats.properties_count, 2);
        assert_eq!(stats.avg_rules_per_property, 2.0);
    }

    #[test]
    fn test_concurrent_registration() {
        use std::thread;

        let rules = RuleCollection::<Account>::new();
        let rules_clone = rules.clone();

        let handle = thread::spawn(move || {
            for i in 0..100 {
                rules_clone.add("name", format!("name-{}", i), |_| true);
            }
        });

        for i in 0..100 {
            rules.add("balance", format!("balance-{}", i), |_| true);
        }

        handle.join().unwrap();

        assert_eq!(rules.len(), 200);
    }
}
