//! Interactive practice loops driven from the terminal.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use rand::rngs::StdRng;
use tracing::info;

use lingua_core::filter::{available_languages, available_types, default_criteria};
use lingua_core::model::{
    ExerciseRecord, ExerciseResult, Field, FilterCriteria, KnowledgeId, KnowledgeItem,
    KnowledgeTypeFilter, Language, PracticeType, Speed,
};
use lingua_core::numbers::NumberRange;
use lingua_core::verify::Verdict;
use services::{
    AttemptOutcome, DataCache, DialogueOutcome, DialoguePracticeError, DialoguePracticeService,
    DialogueSession, DialogueStage, NumberOutcome, NumberPracticeError, NumberPracticeService,
    PracticeLoopService, PracticeSession, RecordOutcome, SessionError, TextAnswer,
};
use storage::media::{AudioClip, SynthesizedAudio};

use crate::console::Console;

/// Which items a practice command draws from.
#[derive(Debug, Clone, Copy)]
pub struct Selection {
    pub language: Option<Language>,
    pub knowledge_type: KnowledgeTypeFilter,
}

impl Selection {
    /// Explicit language, or the corpus default, combined with the type filter.
    fn criteria(self, corpus: &[KnowledgeItem]) -> Option<FilterCriteria> {
        let language = self
            .language
            .or_else(|| default_criteria(corpus).map(|c| c.language))?;
        Some(FilterCriteria::new(language, self.knowledge_type))
    }
}

pub struct Practice {
    cache: DataCache,
    sessions: PracticeLoopService,
    numbers: NumberPracticeService,
    dialogue: DialoguePracticeService,
    rng: StdRng,
}

impl Practice {
    pub fn new(
        cache: DataCache,
        sessions: PracticeLoopService,
        numbers: NumberPracticeService,
        dialogue: DialoguePracticeService,
        rng: StdRng,
    ) -> Self {
        Self {
            cache,
            sessions,
            numbers,
            dialogue,
            rng,
        }
    }

    async fn load_corpus(&self) -> Result<Arc<Vec<KnowledgeItem>>> {
        let state = self.cache.refresh_knowledge().await;
        match (state.data, state.error) {
            (_, Some(error)) => bail!(error),
            (Some(corpus), None) => Ok(corpus),
            (None, None) => Ok(Arc::default()),
        }
    }

    async fn start<R: BufRead, W: Write>(
        &self,
        console: &mut Console<R, W>,
        selection: Selection,
    ) -> Result<Option<PracticeSession>> {
        let corpus = self.load_corpus().await?;
        let session = self
            .sessions
            .start_session(&corpus, selection.criteria(&corpus));
        let Some(criteria) = session.criteria() else {
            console.say("The knowledge base is empty.")?;
            return Ok(None);
        };
        if !session.has_candidates() {
            let languages: Vec<_> =
                available_languages(&corpus).iter().map(ToString::to_string).collect();
            let types: Vec<_> = available_types(&corpus).iter().map(ToString::to_string).collect();
            console.say(format!("Nothing found for {criteria}."))?;
            console.say(format!(
                "Available languages: {}. Available types: {}.",
                languages.join(", "),
                types.join(", ")
            ))?;
            return Ok(None);
        }
        console.say(format!(
            "Practicing {criteria}: {} items. Type :q to stop.",
            session.candidates().len()
        ))?;
        Ok(Some(session))
    }

    /// Present the next unpracticed item, offering a restart once all are done.
    fn next_item<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        session: &mut PracticeSession,
    ) -> Result<Option<KnowledgeItem>> {
        loop {
            if let Some(item) = session.present_next(&mut self.rng)? {
                return Ok(Some(item.clone()));
            }
            if !offer_restart(console, session)? {
                return Ok(None);
            }
        }
    }

    /// Show one field of each item and ask for the others.
    pub async fn translate<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        selection: Selection,
        provided: Field,
    ) -> Result<()> {
        let Some(mut session) = self.start(console, selection).await? else {
            return Ok(());
        };
        console.say(format!("Shown: {provided}. Leave a field blank to skip it."))?;

        while let Some(item) = self.next_item(console, &mut session)? {
            loop {
                console.say("")?;
                console.say(format!(
                    "{provided}: {}",
                    item.field(provided).unwrap_or("(not available)")
                ))?;
                let mut answers = Vec::new();
                for field in provided.dependents() {
                    let Some(value) = console.ask(&format!("{field}?"))? else {
                        return Ok(());
                    };
                    answers.push((field, value));
                }
                let answer = TextAnswer::Translation { provided, answers };
                if self.attempt(console, &mut session, answer).await? {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Drill one field, showing the source text (or the translation when
    /// the source text is the field asked).
    pub async fn fields<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        selection: Selection,
        field: Field,
    ) -> Result<()> {
        let Some(mut session) = self.start(console, selection).await? else {
            return Ok(());
        };
        let shown = TextAnswer::drill_prompt(field);

        while let Some(item) = self.next_item(console, &mut session)? {
            loop {
                console.say("")?;
                console.say(item.field(shown).unwrap_or("(not available)"))?;
                let Some(value) = console.ask(&format!("{field}?"))? else {
                    return Ok(());
                };
                if self
                    .attempt(console, &mut session, TextAnswer::Field { field, value })
                    .await?
                {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Play each item as audio and ask what was heard.
    pub async fn listen<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        selection: Selection,
        audio_dir: &Path,
    ) -> Result<()> {
        let Some(mut session) = self.start(console, selection).await? else {
            return Ok(());
        };
        std::fs::create_dir_all(audio_dir)
            .with_context(|| format!("cannot create {}", audio_dir.display()))?;

        loop {
            let prompt = match self.sessions.next_listening(&mut session, &mut self.rng).await {
                Ok(Some(prompt)) => prompt,
                Ok(None) => {
                    if offer_restart(console, &mut session)? {
                        continue;
                    }
                    return Ok(());
                }
                Err(err @ SessionError::Service { .. }) => {
                    console.say(format!("Could not generate audio: {err}"))?;
                    if console.confirm("Try another item?")? {
                        continue;
                    }
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };

            let stem = file_stem(prompt.item.id());
            let files = write_audio(audio_dir, &stem, "normal", &prompt.normal).and_then(|normal| {
                let slow = write_audio(audio_dir, &stem, "slow", &prompt.slow)?;
                Ok((normal, slow))
            });
            let (normal, slow) = match files {
                Ok(files) => files,
                Err(err) => {
                    console.say(format!("{err:#}"))?;
                    session.withdraw_current()?;
                    if console.confirm("Try another item?")? {
                        continue;
                    }
                    return Ok(());
                }
            };
            console.say("")?;
            console.say(format!("Normal speed: {}", normal.display()))?;
            console.say(format!("Slow speed:   {}", slow.display()))?;

            loop {
                let Some(transcript) = console.ask("What did you hear?")? else {
                    return Ok(());
                };
                let speed = if console.confirm("Did you use the slow version?")? {
                    Speed::Slow
                } else {
                    Speed::Normal
                };
                if self
                    .attempt(console, &mut session, TextAnswer::Listening { transcript, speed })
                    .await?
                {
                    break;
                }
            }
        }
    }

    /// Read each item aloud and submit the recording.
    pub async fn pronounce<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        selection: Selection,
    ) -> Result<()> {
        let Some(mut session) = self.start(console, selection).await? else {
            return Ok(());
        };

        while let Some(item) = self.next_item(console, &mut session)? {
            console.say("")?;
            console.say(format!("Say: {}", item.source_text()))?;
            loop {
                let Some(path) = console.ask("Recording file?")? else {
                    return Ok(());
                };
                let clip = match read_clip(Path::new(path.trim())) {
                    Ok(clip) => clip,
                    Err(err) => {
                        console.say(format!("{err:#}"))?;
                        continue;
                    }
                };
                match self.sessions.answer_audio(&mut session, &clip).await {
                    Ok(outcome) => {
                        report(console, &outcome)?;
                        break;
                    }
                    Err(err @ (SessionError::EmptyRecording | SessionError::Service { .. })) => {
                        console.say(format!("{err}. Try again."))?;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }
        Ok(())
    }

    /// Write out and/or say random numbers from a range.
    pub async fn numbers<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        language: Language,
        range: NumberRange,
    ) -> Result<()> {
        console.say(format!(
            "Numbers from {} to {} in {language}. Type :q to stop.",
            range.min(),
            range.max()
        ))?;
        loop {
            let number = NumberPracticeService::draw(range, &mut self.rng);
            console.say("")?;
            console.say(format!("Number: {number}"))?;
            loop {
                let Some(text) = console.ask("Write it out (blank to skip):")? else {
                    return Ok(());
                };
                let Some(path) = console.ask("Recording file (blank to skip):")? else {
                    return Ok(());
                };
                let clip = if path.trim().is_empty() {
                    None
                } else {
                    match read_clip(Path::new(path.trim())) {
                        Ok(clip) => Some(clip),
                        Err(err) => {
                            console.say(format!("{err:#}"))?;
                            continue;
                        }
                    }
                };
                match self
                    .numbers
                    .verify(number, language, Some(text.as_str()), clip.as_ref())
                    .await
                {
                    Ok(outcome) => {
                        report_number(console, &outcome)?;
                        break;
                    }
                    Err(NumberPracticeError::NoAnswer) => {
                        console.say("Write the number out and/or record it.")?;
                    }
                    Err(err) => {
                        console.say(format!("Could not verify: {err}"))?;
                        if !console.confirm("Try again?")? {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Hold a spoken dialogue: greeting, every question once, farewell.
    pub async fn dialogue<R: BufRead, W: Write>(
        &mut self,
        console: &mut Console<R, W>,
        language: Language,
        audio_dir: &Path,
    ) -> Result<()> {
        let state = self.cache.refresh_dialogue().await;
        let phrases = match (state.data, state.error) {
            (_, Some(error)) => bail!(error),
            (Some(phrases), None) => phrases,
            (None, None) => bail!("no dialogue phrases available"),
        };
        std::fs::create_dir_all(audio_dir)
            .with_context(|| format!("cannot create {}", audio_dir.display()))?;

        let mut session = DialogueSession::new((*phrases).clone(), language);
        console.say(format!(
            "Dialogue in {language}. Answer each phrase aloud. Type :q to stop."
        ))?;

        for turn in 0.. {
            console.say("")?;
            console.say(format!("App: {}", session.current_phrase()))?;
            self.play_phrase(console, &session, audio_dir, turn).await?;

            match session.stage() {
                DialogueStage::Greeting => {
                    if console.ask("Greet back aloud, then press Enter.")?.is_none() {
                        return Ok(());
                    }
                    session.confirm_greeting(&mut self.rng)?;
                }
                DialogueStage::Intermediate => {
                    loop {
                        let Some(path) = console.ask("Recording file (blank to skip)?")? else {
                            return Ok(());
                        };
                        if path.trim().is_empty() {
                            break;
                        }
                        let clip = match read_clip(Path::new(path.trim())) {
                            Ok(clip) => clip,
                            Err(err) => {
                                console.say(format!("{err:#}"))?;
                                continue;
                            }
                        };
                        match self.dialogue.reply(&mut session, &clip).await {
                            Ok(reply) => {
                                console.say(format!("Heard: \"{}\"", reply.transcript))?;
                                console.say(if reply.coherent {
                                    "Coherent answer."
                                } else {
                                    "That does not answer the question."
                                })?;
                                break;
                            }
                            Err(err @ DialoguePracticeError::AlreadyAnswered) => {
                                return Err(err.into());
                            }
                            Err(err) => console.say(format!("{err}. Try again."))?,
                        }
                    }
                    session.next_phrase(&mut self.rng)?;
                }
                DialogueStage::Farewell => loop {
                    if console.ask("Say goodbye aloud, then press Enter.")?.is_none() {
                        return Ok(());
                    }
                    match self.dialogue.finish(&mut session).await {
                        Ok(outcome) => return report_dialogue(console, &outcome),
                        Err(err) => {
                            console.say(format!("Could not analyse the dialogue: {err}"))?;
                            if !console.confirm("Try again?")? {
                                return Ok(());
                            }
                        }
                    }
                },
                DialogueStage::Finished => return Ok(()),
            }
        }
        Ok(())
    }

    /// Write the current phrase as audio at both speeds. Failures only warn.
    async fn play_phrase<R: BufRead, W: Write>(
        &self,
        console: &mut Console<R, W>,
        session: &DialogueSession,
        audio_dir: &Path,
        turn: usize,
    ) -> Result<()> {
        let stem = format!("dialogue-{turn:02}");
        for (label, speed) in [("normal", Speed::Normal), ("slow", Speed::Slow)] {
            let written = match self.dialogue.speak(session, speed).await {
                Ok(audio) => write_audio(audio_dir, &stem, label, &audio),
                Err(err) => Err(err.into()),
            };
            match written {
                Ok(path) => console.say(format!("  {label}: {}", path.display()))?,
                Err(err) => console.say(format!("  no {label} audio: {err:#}"))?,
            }
        }
        Ok(())
    }

    /// List the prompt book, or show one prompt in full.
    pub async fn prompts<R: BufRead, W: Write>(
        &self,
        console: &mut Console<R, W>,
        prompt_id: Option<&str>,
    ) -> Result<()> {
        let state = self.cache.refresh_prompts().await;
        if let Some(error) = state.error {
            bail!(error);
        }
        let Some(book) = state.data else {
            bail!("no prompts available");
        };
        match prompt_id {
            Some(id) => {
                let Some(prompt) = book.find(id) else {
                    bail!("no prompt named {id}");
                };
                console.say(format!("{}: {}", prompt.prompt_id, prompt.description))?;
                console.say(format!("Parameters: {}", prompt.parameters.join(", ")))?;
                console.say("")?;
                console.say(&prompt.template)?;
            }
            None => {
                console.say(format!("{} ({} prompts)", book.description, book.prompts.len()))?;
                for prompt in &book.prompts {
                    console.say(format!("  {:<32} {}", prompt.prompt_id, prompt.description))?;
                }
            }
        }
        Ok(())
    }

    /// Print recorded exercises, newest first.
    pub async fn history<R: BufRead, W: Write>(
        &self,
        console: &mut Console<R, W>,
        practice_type: Option<PracticeType>,
        limit: usize,
    ) -> Result<()> {
        let state = self.cache.refresh_history().await;
        if let Some(error) = state.error {
            bail!(error);
        }
        let history = state.data.unwrap_or_default();
        let recent = history.recent(practice_type);
        if recent.is_empty() {
            console.say("No exercises recorded yet.")?;
            return Ok(());
        }
        for record in recent.into_iter().take(limit) {
            console.say(describe_record(record))?;
        }
        Ok(())
    }

    /// Submit one answer. Returns `false` when the learner should answer again.
    async fn attempt<R: BufRead, W: Write>(
        &self,
        console: &mut Console<R, W>,
        session: &mut PracticeSession,
        answer: TextAnswer,
    ) -> Result<bool> {
        match self.sessions.answer_text(session, answer).await {
            Ok(outcome) => {
                report(console, &outcome)?;
                Ok(true)
            }
            Err(SessionError::InvalidAnswer(err)) => {
                console.say(format!("{err}. Try again."))?;
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn offer_restart<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &mut PracticeSession,
) -> Result<bool> {
    let progress = session.progress();
    console.say(format!("All {} items practiced.", progress.total))?;
    info!(total = progress.total, "session complete");
    if console.confirm("Start over?")? {
        session.restart();
        return Ok(true);
    }
    Ok(false)
}

fn verdict_label(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Correct => "Correct!",
        Verdict::Partial => "Partially correct.",
        Verdict::Incorrect => "Incorrect.",
    }
}

fn report<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    outcome: &AttemptOutcome,
) -> Result<()> {
    console.say(verdict_label(outcome.result.verdict))?;
    console.say(&outcome.result.comment)?;
    if let ExerciseResult::Translation(result) = &outcome.record.result {
        for (field, correct) in result.filled_fields.iter().zip(&result.field_results) {
            console.say(format!("  {field}: {}", if *correct { "ok" } else { "wrong" }))?;
        }
    }
    if outcome.stored == RecordOutcome::Dropped {
        console.say("(not saved to history)")?;
    }
    console.say(format!(
        "Progress: {} / {} practiced",
        outcome.progress.practiced, outcome.progress.total
    ))?;
    Ok(())
}

fn report_number<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    outcome: &NumberOutcome,
) -> Result<()> {
    let result = &outcome.result;
    if let Some(comment) = &result.text_comment {
        console.say(format!("Written: {comment}"))?;
    }
    if let Some(transcript) = &result.audio_transcription {
        console.say(format!("Heard: \"{transcript}\""))?;
    }
    if let Some(comment) = &result.audio_comment {
        console.say(format!("Spoken: {comment}"))?;
    }
    if !outcome.stored.is_stored() {
        console.say("(not saved to history)")?;
    }
    Ok(())
}

fn report_dialogue<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    outcome: &DialogueOutcome,
) -> Result<()> {
    let details = &outcome.interlocutor;
    console.say("")?;
    console.say(format!("Overall: {:?}", outcome.result.correct))?;
    for (label, value) in [
        ("Name", &details.name),
        ("Age", &details.age),
        ("Height", &details.height),
        ("Weight", &details.weight),
    ] {
        let value = if value.is_empty() { "-" } else { value.as_str() };
        console.say(format!("  {label}: {value}"))?;
    }
    if !outcome.stored.is_stored() {
        console.say("(not saved to history)")?;
    }
    Ok(())
}

fn describe_result(result: &ExerciseResult) -> String {
    match result {
        ExerciseResult::Translation(r) => {
            let correct = r.field_results.iter().filter(|ok| **ok).count();
            format!("{correct}/{} fields", r.field_results.len())
        }
        ExerciseResult::Listening(r) => {
            format!("\"{}\" {}", r.user_transcription, if r.correct { "correct" } else { "wrong" })
        }
        ExerciseResult::Pronunciation(r) => format!("\"{}\" {:?}", r.stt_transcription, r.correct),
        ExerciseResult::Number(r) => {
            let verdict = |v: Option<bool>| match v {
                Some(true) => "correct",
                Some(false) => "wrong",
                None => "-",
            };
            format!(
                "{}: text {}, audio {}",
                r.reference_number,
                verdict(r.text_correct),
                verdict(r.audio_correct)
            )
        }
        ExerciseResult::Dialogue(r) => format!("{:?}", r.correct),
        ExerciseResult::Other(value) => value.to_string(),
    }
}

fn describe_record(record: &ExerciseRecord) -> String {
    format!(
        "{}  {:<20} {:<8} {:<16} {}",
        record.timestamp.format("%Y-%m-%d %H:%M"),
        record.practice_type.to_string(),
        record.language.to_string(),
        record.knowledge_item_id.as_str(),
        describe_result(&record.result)
    )
}

/// File name stem for an item id, keeping only `[A-Za-z0-9_-]`.
fn file_stem(id: &KnowledgeId) -> String {
    let stem: String = id
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "item".to_string() } else { stem }
}

fn write_audio(dir: &Path, stem: &str, label: &str, audio: &SynthesizedAudio) -> Result<PathBuf> {
    let path = dir.join(format!("{stem}-{label}.{}", audio.extension()));
    std::fs::write(&path, &audio.bytes)
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(path)
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        _ => "audio/webm",
    }
}

fn read_clip(path: &Path) -> Result<AudioClip> {
    let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map_or_else(|| "recording.webm".to_string(), |n| n.to_string_lossy().into_owned());
    Ok(AudioClip::new(bytes, mime_for(path), file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingua_core::model::{KnowledgeId, KnowledgeType, ListeningResult};
    use lingua_core::time::fixed_now;

    fn item(language: Language) -> KnowledgeItem {
        KnowledgeItem::new(
            KnowledgeId::new("k"),
            language,
            KnowledgeType::Word,
            "Haus",
            "casa",
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn selection_falls_back_to_first_language() {
        let corpus = vec![item(Language::English), item(Language::German)];
        let selection = Selection {
            language: None,
            knowledge_type: KnowledgeType::Word.into(),
        };
        assert_eq!(
            selection.criteria(&corpus),
            Some(FilterCriteria::new(Language::German, KnowledgeType::Word))
        );
        assert_eq!(selection.criteria(&[]), None);
    }

    #[test]
    fn audio_files_stay_inside_the_audio_dir() {
        assert_eq!(file_stem(&KnowledgeId::new("a/../b")), "a____b");
        assert_eq!(file_stem(&KnowledgeId::new("3f2c-9a_b")), "3f2c-9a_b");
        assert_eq!(file_stem(&KnowledgeId::new("")), "item");

        let dir = std::env::temp_dir().join(format!("lingua-audio-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let audio = SynthesizedAudio {
            bytes: vec![1, 2, 3],
            mime_type: "audio/mpeg".into(),
        };
        let stem = file_stem(&KnowledgeId::new("../../x"));
        let path = write_audio(&dir, &stem, "slow", &audio).unwrap();
        assert_eq!(path.parent(), Some(dir.as_path()));
        assert_eq!(path.file_name().unwrap(), "______x-slow.mp3");
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for(Path::new("a.WAV")), "audio/wav");
        assert_eq!(mime_for(Path::new("a.mp3")), "audio/mpeg");
        assert_eq!(mime_for(Path::new("recording")), "audio/webm");
    }

    #[test]
    fn listening_records_are_described() {
        let record = ExerciseRecord::new(
            fixed_now(),
            KnowledgeId::new("k"),
            Language::German,
            PracticeType::Listening,
            ExerciseResult::Listening(ListeningResult {
                source_text: "Haus".into(),
                user_transcription: "Haus".into(),
                correct: true,
                speed: Speed::Normal,
            }),
        );
        let line = describe_record(&record);
        assert!(line.starts_with("2023-11-14 22:13"));
        assert!(line.contains("listening"));
        assert!(line.ends_with("\"Haus\" correct"));
    }
}
