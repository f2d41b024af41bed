//! Phrase segmentation over fixed-size audio chunks.
//!
//! Waits for the first chunk above the energy threshold, keeps a short
//! pre-roll so word onsets are not clipped, and ends the phrase after a run
//! of quiet chunks. Phrases with too little speech are dropped and the
//! detector keeps waiting.

use std::collections::VecDeque;
use std::time::Duration;

use super::energy;

/// Timing knobs for phrase detection.
#[derive(Debug, Clone)]
pub struct PhraseSettings {
    /// Duration of one pushed chunk.
    pub chunk: Duration,
    /// Quiet time that ends a phrase.
    pub pause: Duration,
    /// Minimum speech inside a phrase for it to count.
    pub min_speech: Duration,
    /// Audio kept from before speech onset.
    pub pre_roll: Duration,
    /// Hard cap on phrase length, if any.
    pub time_limit: Option<Duration>,
}

impl Default for PhraseSettings {
    fn default() -> Self {
        Self {
            chunk: Duration::from_millis(80),
            pause: Duration::from_millis(800),
            min_speech: Duration::from_millis(300),
            pre_roll: Duration::from_millis(500),
            time_limit: None,
        }
    }
}

impl PhraseSettings {
    fn chunks_for(&self, d: Duration) -> usize {
        let chunk_ms = self.chunk.as_millis().max(1);
        d.as_millis().div_ceil(chunk_ms) as usize
    }
}

pub struct PhraseDetector {
    threshold: f32,
    pause_chunks: usize,
    min_speech_chunks: usize,
    pre_roll_chunks: usize,
    limit_chunks: Option<usize>,
    pre_roll: VecDeque<Vec<f32>>,
    phrase: Vec<f32>,
    recording: bool,
    speech_chunks: usize,
    silent_run: usize,
    total_chunks: usize,
}

impl PhraseDetector {
    pub fn new(settings: &PhraseSettings, threshold: f32) -> Self {
        Self {
            threshold,
            pause_chunks: settings.chunks_for(settings.pause).max(1),
            min_speech_chunks: settings.chunks_for(settings.min_speech),
            pre_roll_chunks: settings.chunks_for(settings.pre_roll),
            limit_chunks: settings.time_limit.map(|d| settings.chunks_for(d).max(1)),
            pre_roll: VecDeque::new(),
            phrase: Vec::new(),
            recording: false,
            speech_chunks: 0,
            silent_run: 0,
            total_chunks: 0,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// True once speech onset has been seen and the phrase is still open.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Feed one chunk. Returns the finished phrase audio when one completes.
    pub fn push(&mut self, chunk: &[f32]) -> Option<Vec<f32>> {
        let loud = energy::detect(chunk) > self.threshold;

        if !self.recording {
            if !loud {
                self.pre_roll.push_back(chunk.to_vec());
                while self.pre_roll.len() > self.pre_roll_chunks {
                    self.pre_roll.pop_front();
                }
                return None;
            }
            self.recording = true;
            for earlier in self.pre_roll.drain(..) {
                self.phrase.extend_from_slice(&earlier);
            }
        }

        self.phrase.extend_from_slice(chunk);
        self.total_chunks += 1;
        if loud {
            self.speech_chunks += 1;
            self.silent_run = 0;
        } else {
            self.silent_run += 1;
        }

        let paused = self.silent_run >= self.pause_chunks;
        let limited = self
            .limit_chunks
            .is_some_and(|limit| self.total_chunks >= limit);
        if !(paused || limited) {
            return None;
        }

        let enough_speech = self.speech_chunks >= self.min_speech_chunks;
        let phrase = std::mem::take(&mut self.phrase);
        self.reset();
        enough_speech.then_some(phrase)
    }

    fn reset(&mut self) {
        self.pre_roll.clear();
        self.phrase.clear();
        self.recording = false;
        self.speech_chunks = 0;
        self.silent_run = 0;
        self.total_chunks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK: usize = 8;

    fn quiet() -> Vec<f32> {
        vec![0.0; CHUNK]
    }

    fn loud() -> Vec<f32> {
        vec![0.5; CHUNK]
    }

    fn detector(time_limit: Option<Duration>) -> PhraseDetector {
        let settings = PhraseSettings {
            time_limit,
            ..PhraseSettings::default()
        };
        PhraseDetector::new(&settings, 0.1)
    }

    #[test]
    fn silence_never_yields_a_phrase() {
        let mut det = detector(None);
        for _ in 0..100 {
            assert!(det.push(&quiet()).is_none());
        }
        assert!(!det.is_recording());
    }

    #[test]
    fn phrase_ends_after_pause() {
        let mut det = detector(None);
        for _ in 0..5 {
            assert!(det.push(&loud()).is_none());
        }
        // 800 ms pause at 80 ms chunks = 10 quiet chunks.
        for _ in 0..9 {
            assert!(det.push(&quiet()).is_none());
        }
        let phrase = det.push(&quiet()).expect("phrase should complete");
        assert_eq!(phrase.len(), 15 * CHUNK);
        assert!(!det.is_recording());
    }

    #[test]
    fn pre_roll_is_prepended() {
        let mut det = detector(None);
        for _ in 0..20 {
            det.push(&quiet());
        }
        for _ in 0..5 {
            det.push(&loud());
        }
        let mut out = None;
        for _ in 0..10 {
            out = det.push(&quiet());
        }
        // 7 pre-roll chunks + 5 speech + 10 pause.
        assert_eq!(out.unwrap().len(), 22 * CHUNK);
    }

    #[test]
    fn short_blips_are_discarded() {
        let mut det = detector(None);
        det.push(&loud());
        det.push(&loud());
        let mut out = None;
        for _ in 0..10 {
            out = det.push(&quiet());
        }
        assert!(out.is_none());
        assert!(!det.is_recording());
    }

    #[test]
    fn time_limit_cuts_long_phrases() {
        let mut det = detector(Some(Duration::from_millis(800)));
        let mut out = None;
        for _ in 0..10 {
            out = det.push(&loud());
        }
        assert_eq!(out.unwrap().len(), 10 * CHUNK);
    }
}
