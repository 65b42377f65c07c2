use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::object::CounterObject;
use super::protocol::{CounterCommand, CounterReply};
use crate::errors::{ClickLedgerError, Result};

struct Envelope {
    command: CounterCommand,
    reply: oneshot::Sender<Result<CounterReply>>,
}

/// 计数对象的邮箱句柄，可廉价克隆
#[derive(Clone)]
pub struct CounterHandle {
    key: Arc<str>,
    tx: mpsc::Sender<Envelope>,
}

impl CounterHandle {
    /// 在 `runtime` 上启动对象的处理循环
    ///
    /// `idle_timeout` 内没有新指令时循环退出；循环退出后调用 `on_exit`。
    pub fn spawn<F>(
        object: CounterObject,
        mailbox_capacity: usize,
        idle_timeout: Option<Duration>,
        runtime: &Handle,
        on_exit: F,
    ) -> (Self, JoinHandle<()>)
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(mailbox_capacity.max(1));
        let key: Arc<str> = Arc::from(object.key());
        let task = runtime.spawn(async move {
            run(object, rx, idle_timeout).await;
            on_exit();
        });
        (Self { key, tx }, task)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// 处理循环已退出（邮箱关闭）
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// 投递指令，返回等待结果的接收端
    ///
    /// 邮箱已关闭时原样交还指令，调用方可以换一个新对象重投。
    pub async fn enqueue(
        &self,
        command: CounterCommand,
    ) -> std::result::Result<PendingReply, CounterCommand> {
        let (reply, rx) = oneshot::channel();
        match self.tx.send(Envelope { command, reply }).await {
            Ok(()) => Ok(PendingReply {
                key: self.key.clone(),
                rx,
            }),
            Err(mpsc::error::SendError(envelope)) => Err(envelope.command),
        }
    }

    /// 投递指令并等待结果
    ///
    /// 邮箱已关闭或对象未回复时返回 `DurableUnavailable`。
    pub async fn send(&self, command: CounterCommand) -> Result<CounterReply> {
        match self.enqueue(command).await {
            Ok(pending) => pending.wait().await,
            Err(_) => Err(ClickLedgerError::durable_unavailable(format!(
                "Counter {} mailbox closed",
                self.key
            ))),
        }
    }
}

/// 已入队指令的回复
pub struct PendingReply {
    key: Arc<str>,
    rx: oneshot::Receiver<Result<CounterReply>>,
}

impl PendingReply {
    pub async fn wait(self) -> Result<CounterReply> {
        self.rx.await.map_err(|_| {
            ClickLedgerError::durable_unavailable(format!(
                "Counter {} dropped the reply",
                self.key
            ))
        })?
    }
}

async fn run(
    mut object: CounterObject,
    mut rx: mpsc::Receiver<Envelope>,
    idle_timeout: Option<Duration>,
) {
    debug!("Counter {} started", object.key());
    loop {
        let next = match idle_timeout {
            Some(idle) => match tokio::time::timeout(idle, rx.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    debug!("Counter {} idle for {:?}, stopping", object.key(), idle);
                    rx.close();
                    // close 之前已入队的指令照常处理
                    while let Some(envelope) = rx.recv().await {
                        process(&mut object, envelope).await;
                    }
                    return;
                }
            },
            None => rx.recv().await,
        };
        match next {
            Some(envelope) => process(&mut object, envelope).await,
            None => break,
        }
    }
    debug!("Counter {} mailbox closed, stopping", object.key());
}

async fn process(object: &mut CounterObject, Envelope { command, reply }: Envelope) {
    // 调用方已超时放弃
    if reply.is_closed() {
        debug!(
            "Counter {} skipping abandoned '{}' command",
            object.key(),
            command.operation()
        );
        return;
    }

    let op = command.operation();
    let result = object.handle(command).await;
    match &result {
        Ok(_) => trace!("Counter {} handled '{}'", object.key(), op),
        Err(e) => warn!("Counter {} '{}' failed: {}", object.key(), op, e),
    }
    let _ = reply.send(result);
}
