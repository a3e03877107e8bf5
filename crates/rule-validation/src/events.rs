//! 变更通知
//!
//! 订阅者按注册顺序在调用线程上同步执行。分发前先对订阅列表做快照，
//! 因此处理函数中可以安全地订阅或取消订阅；取消订阅在下一次分发时生效。

use std::cell::{Cell, RefCell};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::{Stream, StreamExt};

use crate::key::PropertyKey;

/// 聚合校验状态的合成属性名
pub const HAS_ERRORS_PROPERTY: &str = "HasErrors";

/// 属性变更通知
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyChanged<K> {
    /// 模型属性
    Property(K),
    /// 合成属性 `HasErrors`，每次变更校验完成后都会通知
    HasErrors,
}

impl<K: PropertyKey> PropertyChanged<K> {
    pub fn name(&self) -> &str {
        match self {
            Self::Property(key) => key.name(),
            Self::HasErrors => HAS_ERRORS_PROPERTY,
        }
    }

    pub fn is_has_errors(&self) -> bool {
        matches!(self, Self::HasErrors)
    }
}

/// 订阅标识，用于取消订阅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

enum Sink<T, E> {
    Handler(Rc<dyn Fn(&T, &E)>),
    Channel(UnboundedSender<E>),
}

impl<T, E> Clone for Sink<T, E> {
    fn clone(&self) -> Self {
        match self {
            Self::Handler(handler) => Self::Handler(Rc::clone(handler)),
            Self::Channel(sender) => Self::Channel(sender.clone()),
        }
    }
}

/// 有序订阅者列表
pub(crate) struct Subscribers<T, E> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(SubscriptionId, Sink<T, E>)>>,
}

impl<T, E: Clone> Subscribers<T, E> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            entries: RefCell::new(Vec::new()),
        }
    }

    fn insert(&self, sink: Sink<T, E>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, sink));
        id
    }

    pub(crate) fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&T, &E) + 'static,
    {
        self.insert(Sink::Handler(Rc::new(handler)))
    }

    pub(crate) fn subscribe_channel(&self) -> UnboundedReceiver<E> {
        let (sender, receiver) = mpsc::unbounded();
        self.insert(Sink::Channel(sender));
        receiver
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// 按注册顺序通知所有订阅者，返回通知数量
    pub(crate) fn dispatch(&self, instance: &T, event: &E) -> usize {
        let snapshot: Vec<Sink<T, E>> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, sink)| sink.clone())
            .collect();

        let mut closed = false;
        for sink in &snapshot {
            match sink {
                Sink::Handler(handler) => handler(instance, event),
                Sink::Channel(sender) => {
                    if sender.unbounded_send(event.clone()).is_err() {
                        closed = true;
                    }
                }
            }
        }

        // 接收端已丢弃的流在这里清理
        if closed {
            self.entries
                .borrow_mut()
                .retain(|(_, sink)| !matches!(sink, Sink::Channel(sender) if sender.is_closed()));
        }

        snapshot.len()
    }
}

impl<T, E: Clone> Default for Subscribers<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// 错误变更推送流
///
/// 每次错误变更通知产生一项：`Some(key)` 表示单个属性，`None` 表示整个对象重新计算。
/// 丢弃流即取消订阅。
pub struct ErrorsChangedStream<K> {
    receiver: UnboundedReceiver<Option<K>>,
}

impl<K> ErrorsChangedStream<K> {
    pub(crate) fn new(receiver: UnboundedReceiver<Option<K>>) -> Self {
        Self { receiver }
    }
}

impl<K> Stream for ErrorsChangedStream<K> {
    type Item = Option<K>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_next_unpin(cx)
    }
}
