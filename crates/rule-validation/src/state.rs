//! 校验状态
//!
//! 每个实例持有一份 [`ValidationState`]：错误缓存、两组订阅者，以及共享规则集合的句柄。
//!
//! 错误缓存的生命周期：
//! - 未初始化：首次查询或首次变更时对所有已注册属性做一次全量校验
//! - 已初始化：每次属性变更只重新评估该属性的规则并更新对应的键
//!
//! 缓存中存在某个属性键，当且仅当该属性当前至少有一条规则不满足。

use std::cell::RefCell;
use std::fmt;
use std::time::Instant;

use indexmap::{IndexMap, IndexSet};
use indexmap::map::Entry;
use tracing::{debug, trace};
use validation_shared::config::InitMode;
use validation_shared::observability::metrics::{self, PassKind};

use crate::collection::RuleCollection;
use crate::error::Result;
use crate::events::{ErrorsChangedStream, PropertyChanged, SubscriptionId, Subscribers};
use crate::key::PropertyKey;
use crate::validatable::Validatable;

type ErrorCache<T> = IndexMap<<T as Validatable>::Key, Vec<<T as Validatable>::Error>>;

/// 实例级校验状态
pub struct ValidationState<T: Validatable> {
    rules: RuleCollection<T>,
    cache: RefCell<Option<ErrorCache<T>>>,
    property_changed: Subscribers<T, PropertyChanged<T::Key>>,
    errors_changed: Subscribers<T, Option<T::Key>>,
}

impl<T: Validatable> ValidationState<T> {
    /// 创建校验状态，与同类型的其他实例共享 `rules`
    pub fn new(rules: &RuleCollection<T>) -> Self {
        Self {
            rules: rules.clone(),
            cache: RefCell::new(None),
            property_changed: Subscribers::new(),
            errors_changed: Subscribers::new(),
        }
    }

    pub fn rules(&self) -> &RuleCollection<T> {
        &self.rules
    }

    /// 错误缓存是否已初始化
    pub fn is_initialized(&self) -> bool {
        self.cache.borrow().is_some()
    }

    pub fn has_errors(&self, instance: &T) -> Result<bool> {
        self.ensure_initialized(instance)?;
        Ok(self
            .cache
            .borrow()
            .as_ref()
            .is_some_and(|cache| !cache.is_empty()))
    }

    /// 所有错误：先按属性首次注册顺序，再按规则注册顺序
    ///
    /// 规则集合清空后残留在缓存中的属性排在最后。
    pub fn errors(&self, instance: &T) -> Result<Vec<T::Error>> {
        self.ensure_initialized(instance)?;

        let order: IndexSet<T::Key> = self.rules.properties().into_iter().collect();
        let guard = self.cache.borrow();
        let Some(cache) = guard.as_ref() else {
            return Ok(Vec::new());
        };

        let mut all = Vec::new();
        for property in &order {
            if let Some(errors) = cache.get(property) {
                all.extend(errors.iter().cloned());
            }
        }
        for (property, errors) in cache {
            if !order.contains(property) {
                all.extend(errors.iter().cloned());
            }
        }

        Ok(all)
    }

    /// 某个属性的错误，没有错误时返回空列表
    pub fn errors_for(&self, instance: &T, property: &T::Key) -> Result<Vec<T::Error>> {
        self.ensure_initialized(instance)?;

        let errors = self
            .cache
            .borrow()
            .as_ref()
            .and_then(|cache| cache.get(property).cloned());

        if cfg!(debug_assertions) && errors.is_none() && self.rules.rules_for(property).is_empty() {
            debug!(
                model = std::any::type_name::<T>(),
                property = property.name(),
                "查询的属性没有注册任何规则"
            );
        }

        Ok(errors.unwrap_or_default())
    }

    /// 属性已变更：通知、增量校验、错误变更通知、`HasErrors` 通知
    pub fn property_changed(&self, instance: &T, property: T::Key) -> Result<()> {
        self.notify_property_changed(instance, PropertyChanged::Property(property.clone()));

        // 由本次变更触发的初始化已经包含新值，该属性视为此前没有错误
        let first_pass = !self.is_initialized();
        self.ensure_initialized(instance)?;
        let changed = if first_pass {
            self.has_cached(&property)
        } else {
            self.apply_property(instance, &property)?
        };

        if changed {
            self.notify_errors_changed(instance, Some(property));
        }

        // 无论聚合状态是否翻转都会通知
        self.notify_property_changed(instance, PropertyChanged::HasErrors);
        Ok(())
    }

    /// 重新校验所有已注册属性并替换整个缓存
    pub fn revalidate(&self, instance: &T) -> Result<()> {
        if self.rescan(instance)? {
            self.notify_errors_changed(instance, None);
        }
        self.notify_property_changed(instance, PropertyChanged::HasErrors);
        Ok(())
    }

    pub fn subscribe_property_changed<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&T, &PropertyChanged<T::Key>) + 'static,
    {
        self.property_changed.subscribe(handler)
    }

    pub fn unsubscribe_property_changed(&self, id: SubscriptionId) -> bool {
        self.property_changed.unsubscribe(id)
    }

    pub fn subscribe_errors_changed<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&T, &Option<T::Key>) + 'static,
    {
        self.errors_changed.subscribe(handler)
    }

    pub fn unsubscribe_errors_changed(&self, id: SubscriptionId) -> bool {
        self.errors_changed.unsubscribe(id)
    }

    pub fn when_errors_changed(&self) -> ErrorsChangedStream<T::Key> {
        ErrorsChangedStream::new(self.errors_changed.subscribe_channel())
    }

    /// 首次访问时初始化错误缓存
    fn ensure_initialized(&self, instance: &T) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }

        debug!(
            model = std::any::type_name::<T>(),
            mode = ?self.rules.options().init_mode,
            "初始化错误缓存"
        );

        if self.rescan(instance)? {
            self.notify_errors_changed(instance, None);
        }
        Ok(())
    }

    /// 全量校验并提交缓存，返回缓存内容是否变化
    ///
    /// 事务模式下任何谓词故障都会丢弃本轮结果。部分模式下故障前已评估的属性逐个写入缓存，
    /// 故障属性及其后的属性保持原样；缓存尚未初始化时以已评估的部分作为初始缓存。
    fn rescan(&self, instance: &T) -> Result<bool> {
        let start = Instant::now();
        let mut evaluated = Vec::new();
        let mut fault = None;

        for property in self.rules.properties() {
            match self.rules.apply(instance, &property) {
                Ok(errors) => evaluated.push((property, errors)),
                Err(e) => {
                    fault = Some(e);
                    break;
                }
            }
        }

        if self.rules.options().init_mode == InitMode::Transactional {
            if let Some(e) = fault {
                return Err(e);
            }
        }

        let changed = {
            let mut guard = self.cache.borrow_mut();
            if fault.is_some() && guard.is_some() {
                let cache = guard.get_or_insert_with(ErrorCache::<T>::new);
                let mut changed = false;
                for (property, errors) in evaluated {
                    changed |= store_errors::<T>(cache, &property, errors);
                }
                changed
            } else {
                let scanned: ErrorCache<T> = evaluated
                    .into_iter()
                    .filter(|(_, errors)| !errors.is_empty())
                    .collect();
                let changed = match guard.as_ref() {
                    Some(current) => *current != scanned,
                    None => !scanned.is_empty(),
                };
                *guard = Some(scanned);
                changed
            }
        };

        metrics::record_validation_pass(PassKind::Full, start.elapsed().as_secs_f64());
        match fault {
            Some(e) => Err(e),
            None => Ok(changed),
        }
    }

    /// 增量校验单个属性，返回该属性的错误列表是否变化
    fn apply_property(&self, instance: &T, property: &T::Key) -> Result<bool> {
        let start = Instant::now();
        let errors = self.rules.apply(instance, property)?;

        let changed = {
            let mut guard = self.cache.borrow_mut();
            let cache = guard.get_or_insert_with(ErrorCache::<T>::new);
            store_errors::<T>(cache, property, errors)
        };

        metrics::record_validation_pass(PassKind::Incremental, start.elapsed().as_secs_f64());
        Ok(changed)
    }

    fn has_cached(&self, property: &T::Key) -> bool {
        self.cache
            .borrow()
            .as_ref()
            .is_some_and(|cache| cache.contains_key(property))
    }

    fn notify_property_changed(&self, instance: &T, event: PropertyChanged<T::Key>) {
        let notified = self.property_changed.dispatch(instance, &event);
        trace!(property = event.name(), subscribers = notified, "属性变更已通知");
    }

    fn notify_errors_changed(&self, instance: &T, property: Option<T::Key>) {
        let notified = self.errors_changed.dispatch(instance, &property);
        metrics::record_errors_changed(std::any::type_name::<T>());
        trace!(
            property = ?property,
            subscribers = notified,
            "错误变更已通知"
        );
    }
}

/// 写入单个属性的错误列表：有错误时插入或替换，没有错误时移除键。返回是否变化
fn store_errors<T: Validatable>(
    cache: &mut ErrorCache<T>,
    property: &T::Key,
    errors: Vec<T::Error>,
) -> bool {
    if errors.is_empty() {
        return cache.shift_remove(property).is_some();
    }
    match cache.entry(property.clone()) {
        Entry::Occupied(mut entry) => {
            if *entry.get() == errors {
                false
            } else {
                entry.insert(errors);
                true
            }
        }
        Entry::Vacant(entry) => {
            entry.insert(errors);
            true
        }
    }
}

/// 克隆得到共享同一规则集合的全新状态：缓存未初始化，没有订阅者
impl<T: Validatable> Clone for ValidationState<T> {
    fn clone(&self) -> Self {
        Self::new(&self.rules)
    }
}

impl<T: Validatable> fmt::Debug for ValidationState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ValidationState");
        match self.cache.try_borrow() {
            Ok(cache) => debug.field("errors", &*cache),
            Err(_) => debug.field("errors", &"<borrowed>"),
        };
        debug
            .field("property_changed_subscribers", &self.property_changed.len())
            .field("errors_changed_subscribers", &self.errors_changed.len())
            .finish_non_exhaustive()
    }
}
