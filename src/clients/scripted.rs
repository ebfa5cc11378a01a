//! Deterministic, in-process generator and enhancer doubles for tests and
//! offline development. No network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::clients::traits::{
    Enhancer, EnhancerError, GenerationParams, Generator, GeneratorError, ModelStatus,
};

/// One scripted reply: text, or a fault message.
pub type Reply = Result<String, String>;

/// Replays scripted replies in order, then repeats the last one forever.
#[derive(Debug)]
struct Script {
    queue: Mutex<VecDeque<Reply>>,
    last: Mutex<Reply>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl Script {
    fn new(replies: Vec<Reply>) -> Self {
        let last = replies
            .last()
            .cloned()
            .unwrap_or_else(|| Err("no scripted reply".to_string()));
        Self {
            queue: Mutex::new(replies.into()),
            last: Mutex::new(last),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn next(&self, prompt: &str) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let popped = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        match popped {
            Some(reply) => {
                if let Ok(mut last) = self.last.lock() {
                    *last = reply.clone();
                }
                reply
            }
            None => self
                .last
                .lock()
                .map(|l| l.clone())
                .unwrap_or_else(|_| Err("script poisoned".to_string())),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct ScriptedGenerator {
    name: String,
    script: Script,
    loaded: AtomicBool,
}

impl ScriptedGenerator {
    pub fn new(name: impl Into<String>, replies: Vec<Reply>) -> Self {
        Self {
            name: name.into(),
            script: Script::new(replies),
            loaded: AtomicBool::new(false),
        }
    }

    pub fn always(text: impl Into<String>) -> Self {
        Self::new("scripted", vec![Ok(text.into())])
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::new("scripted", vec![Err(message.into())])
    }

    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.script.prompts()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, _params: GenerationParams) -> Result<String, GeneratorError> {
        let reply = self.script.next(prompt).map_err(GeneratorError::Transport)?;
        self.loaded.store(true, Ordering::SeqCst);
        Ok(reply)
    }

    fn status(&self) -> ModelStatus {
        ModelStatus {
            name: self.name.clone(),
            loaded: self.loaded.load(Ordering::SeqCst),
        }
    }

    async fn release(&self) {
        self.loaded.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct ScriptedEnhancer {
    script: Script,
    reachable: bool,
}

impl ScriptedEnhancer {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            script: Script::new(replies),
            reachable: true,
        }
    }

    pub fn always(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(text.into())])
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(vec![Err(message.into())])
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.script.prompts()
    }
}

#[async_trait]
impl Enhancer for ScriptedEnhancer {
    async fn complete(&self, prompt: &str, _params: GenerationParams) -> Result<String, EnhancerError> {
        self.script.next(prompt).map_err(EnhancerError::Transport)
    }

    fn model(&self) -> &str {
        "scripted-enhancer"
    }

    async fn test_connection(&self) -> bool {
        self.reachable
    }
}
