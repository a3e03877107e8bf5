//! 可校验对象
//!
//! 模型持有一份 [`ValidationState`] 并实现 [`Validatable`]，即可获得属性变更跟踪、
//! 自动重新校验、错误缓存和变更通知。每个可变字段的 setter 都应通过
//! [`Validatable::set_property`] 赋值。
//!
//! setter 需要 `&mut self`，而订阅者只能拿到 `&T`，因此处理函数无法在通知期间
//! 重入同一实例的变更路径。谓词同样只拿到 `&T`，不应在谓词中查询本实例的错误状态。

use std::fmt;

use crate::collection::RuleCollection;
use crate::error::{BoxError, Result};
use crate::events::{ErrorsChangedStream, PropertyChanged, SubscriptionId};
use crate::key::PropertyKey;
use crate::state::ValidationState;

/// 可校验对象
pub trait Validatable: Sized + 'static {
    /// 属性键
    type Key: PropertyKey;
    /// 错误负载，引擎只做相等比较，不解析内容
    type Error: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    fn validation(&self) -> &ValidationState<Self>;

    /// 本类型共享的规则集合
    fn rules(&self) -> &RuleCollection<Self> {
        self.validation().rules()
    }

    /// 为本类型的所有实例注册规则
    fn add_rule<F>(&self, property: Self::Key, error: Self::Error, predicate: F)
    where
        F: Fn(&Self) -> bool + Send + Sync + 'static,
    {
        self.rules().add(property, error, predicate);
    }

    /// 为本类型的所有实例注册可能失败的规则
    fn add_fallible_rule<F>(&self, property: Self::Key, error: Self::Error, predicate: F)
    where
        F: Fn(&Self) -> std::result::Result<bool, BoxError> + Send + Sync + 'static,
    {
        self.rules().add_fallible(property, error, predicate);
    }

    /// 清空本类型的所有规则，已缓存的错误保留到下次变更或重新校验
    fn clear_rules(&self) {
        self.rules().clear();
    }

    fn has_errors(&self) -> Result<bool> {
        self.validation().has_errors(self)
    }

    fn errors(&self) -> Result<Vec<Self::Error>> {
        self.validation().errors(self)
    }

    fn errors_for(&self, property: &Self::Key) -> Result<Vec<Self::Error>> {
        self.validation().errors_for(self, property)
    }

    /// 给字段赋值并触发校验
    ///
    /// 新值与当前值相等时什么都不做并返回 `Ok(false)`。否则赋值后依次：
    /// 通知属性变更、重新评估该属性的规则、错误列表变化时通知错误变更、
    /// 通知 `HasErrors`，最后返回 `Ok(true)`。谓词故障时值已写入，返回错误。
    ///
    /// 首次变更会先初始化错误缓存并通知整个对象的错误变更；此时该属性若有错误，
    /// 随后仍会收到针对该属性的错误变更通知。
    fn set_property<V, F>(&mut self, property: Self::Key, value: V, field: F) -> Result<bool>
    where
        V: PartialEq,
        F: FnOnce(&mut Self) -> &mut V,
    {
        let slot = field(self);
        if *slot == value {
            return Ok(false);
        }
        *slot = value;

        self.notify_property_changed(property)?;
        Ok(true)
    }

    /// 不赋值，直接按属性已变更处理（用于计算属性）
    fn notify_property_changed(&self, property: Self::Key) -> Result<()> {
        self.validation().property_changed(self, property)
    }

    /// 重新校验所有属性
    fn revalidate(&self) -> Result<()> {
        self.validation().revalidate(self)
    }

    fn subscribe_property_changed<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Self, &PropertyChanged<Self::Key>) + 'static,
    {
        self.validation().subscribe_property_changed(handler)
    }

    fn unsubscribe_property_changed(&self, id: SubscriptionId) -> bool {
        self.validation().unsubscribe_property_changed(id)
    }

    fn subscribe_errors_changed<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Self, &Option<Self::Key>) + 'static,
    {
        self.validation().subscribe_errors_changed(handler)
    }

    fn unsubscribe_errors_changed(&self, id: SubscriptionId) -> bool {
        self.validation().unsubscribe_errors_changed(id)
    }

    /// 错误变更推送流
    fn when_errors_changed(&self) -> ErrorsChangedStream<Self::Key> {
        self.validation().when_errors_changed()
    }
}
