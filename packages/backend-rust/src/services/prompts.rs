use crate::domain::{Level, Scenario};

pub const DEFAULT_NATIVE_LANGUAGE: &str = "Czech";

pub const OPENING_INSTRUCTION: &str =
    "Start the conversation now. Remember: ONE short greeting and ONE question only!";

pub fn scenario_description(scenario: Scenario) -> &'static str {
    match scenario {
        Scenario::Airport => {
            "At the airport. The student arrives at the check-in counter to drop off luggage, \
             goes through security and has to find the right gate. It is busy, with announcements \
             and other travellers all around."
        }
        Scenario::Restaurant => {
            "At a restaurant. The student reads the menu, orders food and drinks and may have to \
             sort out a small problem such as a wrong dish, a delay or a missing item. Friendly but \
             slightly formal."
        }
        Scenario::Hotel => {
            "At a hotel. The student checks in at reception, asks about services such as breakfast, \
             Wi-Fi or the gym, or reports a problem with the room."
        }
        Scenario::Cafe => {
            "At a cafe. The student orders coffee, tea or a snack and may chat with the barista or \
             another guest. Relaxed and informal."
        }
        Scenario::Shop => {
            "At a clothing store. The student looks for particular clothes, asks about sizes, tries \
             things on and may return or exchange a purchase."
        }
        Scenario::Doctor => {
            "At the doctor's office. The student describes symptoms, answers questions about their \
             health and listens to advice or a possible diagnosis."
        }
        Scenario::JobInterview => {
            "At a job interview. The student talks about their background, education and work \
             experience. The interviewer may also ask situational or personality questions."
        }
        Scenario::Bank => {
            "At the bank. The student wants to open an account, apply for a card or ask about loans \
             and other services."
        }
        Scenario::Random => {
            "An unexpected situation. Pick a surprising, engaging and unusual real-life setting that \
             makes the student think creatively and use spontaneous English."
        }
    }
}

fn level_persona(level: Level) -> (&'static str, &'static str) {
    match level {
        Level::A1 => (
            "You are an English tutor for A1 (beginner) level.\nUse the simple present tense and basic phrases only.",
            "Open by introducing yourself, describe the place in a few words and ask one simple question about the situation.\nStay friendly and patient.",
        ),
        Level::A2 => (
            "You are an English tutor for A2 (elementary) level.\nUse basic grammar and short everyday questions.",
            "Open by describing the surroundings, then greet the student and ask one simple, natural question.",
        ),
        Level::B1 => (
            "You are an English tutor for B1 (intermediate) level.\nUse common tenses and invite the student to share opinions and experiences.",
            "Open with a short, vivid description of the place, then ask a question that calls for a full-sentence answer.",
        ),
        Level::B2 => (
            "You are an English tutor for B2 (upper-intermediate) level.\nUse phrasal verbs, idioms and complex tenses.",
            "Open by describing the atmosphere and ask a question that needs reasoning or a mix of tenses (for example \"What would you have done if...?\").",
        ),
        Level::C1 => (
            "You are an English tutor for C1 (advanced) level.\nUse advanced vocabulary, idiomatic language and detailed questions.",
            "Describe the setting richly, then ask a thought-provoking or hypothetical question that tests fluency.",
        ),
        Level::C2 => (
            "You are an English tutor for C2 (proficiency) level.\nUse complex grammar, idioms and natural-sounding speech.",
            "Paint a vivid scene, then ask a deep or abstract question that uses advanced grammar or conditionals.",
        ),
    }
}

/// Role-play system prompt for a lesson.
pub fn system_prompt(level: Level, scenario: Scenario) -> String {
    let (persona, opening) = level_persona(level);
    format!(
        "{persona}\n\nSCENARIO: {}\n\n{opening}\nKeep every reply short and end it with exactly one question.",
        scenario_description(scenario)
    )
}

pub fn mistake_detection_prompt(level: Level, native_language: &str) -> String {
    format!(
        r#"You are an English teacher. Check the student's message for grammar, vocabulary, word order and spelling mistakes, judged for level {level}.

Return ONLY a JSON object in exactly this format:
{{
  "hasMistakes": true or false,
  "mistakes": [
    {{
      "original": "the exact wrong text from the message",
      "corrected": "the correct version",
      "type": "grammar|spelling|word-order|vocabulary",
      "explanation": "why it is wrong and how to say it correctly"
    }}
  ]
}}

RULES:
- Write every explanation in {native_language}, addressing the student directly in the second person.
- Be specific and clear.
- Report even small mistakes.
- If the message is correct, return "hasMistakes": false and an empty list."#
    )
}

pub fn mistake_detection_request(message: &str) -> String {
    format!("Analyze this message: \"{message}\"")
}

/// Extra system turn asking the tutor to model the right forms in its next reply.
pub fn correction_hint(mistakes_json: &str) -> String {
    format!(
        "The student made these mistakes: {mistakes_json}.\n\
         Correct them gently as the conversation goes on: do not interrupt, just use the correct forms naturally."
    )
}

pub const RECAP_PROMPT: &str = "You are a supportive English tutor summarizing a finished lesson.\n\
Write a short recap in English that mentions:\n\
- what the student did well,\n\
- the most common types of mistakes,\n\
- two or three personal tips for improvement.\n\
Keep it friendly, motivating and concise (at most 8 sentences).";

pub const RECAP_FALLBACK: &str = "Lesson recap could not be generated due to a technical issue.";

pub fn recap_request(mistakes_json: Option<&str>) -> String {
    format!(
        "Here are the student's mistakes from the lesson: {}",
        mistakes_json.unwrap_or("No mistakes recorded.")
    )
}

pub fn word_translation_prompt(native_language: &str) -> String {
    format!(
        "You are a translator. Translate the English word into {native_language}. \
         Return ONLY the translation, with no other comments."
    )
}

pub fn sentence_translation_prompt(native_language: &str) -> String {
    format!(
        "You are a translator. Translate the English sentence into {native_language}. \
         Return ONLY the translation, with no other comments."
    )
}

pub fn translation_request(text: &str) -> String {
    format!("Translate: \"{text}\"")
}

pub fn word_analysis_prompt(level: Level, native_language: &str) -> String {
    format!(
        r#"You are an English teacher. Pick out the significant words in the text for a student at level {level}.

Return ONLY a JSON object in this format:
{{
  "words": [
    {{
      "word": "exact word from the text",
      "translation": "translation into {native_language}"
    }}
  ]
}}

Only choose words that:
- a student at level {level} probably does not know,
- matter for understanding the sentence,
- are nouns, verbs, adjectives or important adverbs.
Never choose articles (a, an, the), prepositions (in, on, at) or conjunctions (and, but, or).

At most 5-8 of the most important words."#
    )
}

pub fn word_analysis_request(text: &str) -> String {
    format!("Analyze: \"{text}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_embeds_level_and_scene() {
        let prompt = system_prompt(Level::B2, Scenario::Airport);
        assert!(prompt.contains("B2 (upper-intermediate)"));
        assert!(prompt.contains("check-in counter"));
    }

    #[test]
    fn every_level_and_scenario_has_a_prompt() {
        for level in Level::ALL {
            for scenario in Scenario::ALL {
                let prompt = system_prompt(level, scenario);
                assert!(prompt.contains(level.as_str()));
                assert!(prompt.contains("SCENARIO: "));
            }
        }
    }

    #[test]
    fn analysis_prompts_name_the_native_language() {
        assert!(mistake_detection_prompt(Level::A1, "Polish").contains("in Polish"));
        assert!(word_analysis_prompt(Level::C1, "German").contains("into German"));
        assert!(word_translation_prompt("Czech").contains("into Czech"));
    }

    #[test]
    fn recap_request_falls_back_when_there_are_no_mistakes() {
        assert!(recap_request(None).ends_with("No mistakes recorded."));
        assert!(recap_request(Some("[1]")).ends_with("[1]"));
    }
}
