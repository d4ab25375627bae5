//! 完成回报：把 format 结果按 task id 回传给外部任务系统。

use crate::ControlError;
use async_trait::async_trait;
use domain::TaskId;
use tracing::debug;

/// 完成回报抽象。
#[async_trait]
pub trait CompletionReporter: Send + Sync {
    async fn report(&self, task_id: &TaskId, result: &str) -> Result<(), ControlError>;
}

/// 未配置回报地址时使用。
#[derive(Debug, Default)]
pub struct NoopReporter;

#[async_trait]
impl CompletionReporter for NoopReporter {
    async fn report(&self, task_id: &TaskId, _result: &str) -> Result<(), ControlError> {
        debug!(target: "trk.control", task_id = %task_id, "report_skipped_no_endpoint");
        Ok(())
    }
}

/// URL 编码表单：`id_action=<task id>&result=<result>`。
#[derive(Debug, Clone)]
pub struct HttpCompletionReporter {
    client: reqwest::Client,
    url: String,
}

impl HttpCompletionReporter {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

pub(crate) fn report_form<'a>(task_id: &'a TaskId, result: &'a str) -> [(&'static str, &'a str); 2] {
    [("id_action", task_id.as_str()), ("result", result)]
}

#[async_trait]
impl CompletionReporter for HttpCompletionReporter {
    async fn report(&self, task_id: &TaskId, result: &str) -> Result<(), ControlError> {
        self.client
            .post(&self.url)
            .form(&report_form(task_id, result))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| ControlError::Report(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_fields_match_finish_endpoint() {
        let task = TaskId::from("15");
        let form = report_form(&task, "{\"list\":[]}");
        assert_eq!(form[0], ("id_action", "15"));
        assert_eq!(form[1], ("result", "{\"list\":[]}"));
    }
}
