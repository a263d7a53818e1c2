use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ai::models::{Pricing, Provider, UsageReport};
use crate::ai::{AiAdapter, AiResponse};
use crate::error::MrAgentError;

/// A recorded model call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
}

/// Mock adapter that returns pre-configured responses in order and
/// records every call. The last response repeats once the queue drains.
pub struct MockAiAdapter {
    responses: Mutex<VecDeque<String>>,
    recorded: Mutex<Vec<RecordedCall>>,
}

impl MockAiAdapter {
    pub fn new(response: impl Into<String>) -> Self {
        Self::with_responses(vec![response.into()])
    }

    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            recorded: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiAdapter for MockAiAdapter {
    fn provider(&self) -> Provider {
        Provider::Claude
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }

    fn display_name(&self) -> &str {
        "Mock Model"
    }

    fn pricing(&self) -> Pricing {
        Pricing {
            input_per_million: 3.0,
            output_per_million: 15.0,
        }
    }

    async fn complete(&self, system: &str, user: &str) -> Result<AiResponse, MrAgentError> {
        self.recorded.lock().unwrap().push(RecordedCall {
            system: system.to_string(),
            user: user.to_string(),
        });

        let mut responses = self.responses.lock().unwrap();
        let text = if responses.len() == 1 {
            responses.front().unwrap().clone()
        } else {
            responses
                .pop_front()
                .ok_or_else(|| MrAgentError::AiAdapter("no more mock responses".into()))?
        };

        Ok(AiResponse {
            text,
            usage: Some(UsageReport::from_in_out(Provider::Claude, 100, 200)),
        })
    }
}
