// ============================================================
// Layer 2 — Translate Use Case
// ============================================================
// Loads the trained translator once and answers any number of
// `translate` calls with it:
//
//   1. Open the checkpoint directory
//   2. Rebuild vocabularies + model (best-BLEU epoch, else latest)
//   3. Greedy decode each sentence

use anyhow::Result;

use crate::domain::traits::Translator;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::translator::GreedyTranslator;

type InferBackend = burn::backend::Wgpu;

pub struct TranslateUseCase {
    translator: GreedyTranslator<InferBackend>,
}

impl TranslateUseCase {
    pub fn new(checkpoint_dir: &str) -> Result<Self> {
        let ckpt       = CheckpointManager::new(checkpoint_dir)?;
        let device     = burn::backend::wgpu::WgpuDevice::default();
        let translator = GreedyTranslator::from_checkpoint(&ckpt, device)?;
        Ok(Self { translator })
    }
}

impl Translator for TranslateUseCase {
    fn translate(&self, sentence: &str) -> Result<String> {
        let words = self.translator.translate_words(sentence)?;
        tracing::debug!("Generated {} words", words.len());
        Ok(words.join(" "))
    }
}
