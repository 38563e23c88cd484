use async_trait::async_trait;
use serde_json::Value;

/// A local action the model can request. The returned value is sent back
/// to the model verbatim as the tool result.
pub trait Tool {
    type Context;
    fn apply(&self, context: Self::Context) -> Value;
}

#[async_trait]
pub trait AsyncTool: Send + Sync {
    type Context;
    async fn apply(&self, context: Self::Context) -> anyhow::Result<Value>;
}

pub struct AsyncToolWrapper<C> {
    pub tool: Box<dyn Tool<Context = C> + Send + Sync>,
}

#[async_trait]
impl<C> AsyncTool for AsyncToolWrapper<C>
where
    C: Send + Sync + 'static,
{
    type Context = C;

    async fn apply(&self, context: C) -> anyhow::Result<Value> {
        Ok(self.tool.apply(context))
    }
}
