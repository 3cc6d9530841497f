//! Prompt bodies sent to the model.

use crate::interview::{RoleDescriptor, TranscriptEntry};

pub const TRANSCRIBE_PROMPT: &str = "Transcribe only the words spoken in this video. \
Ignore everything visual. Return plain text with no labels, timestamps or commentary. \
If nobody speaks, return an empty response.";

pub fn introduction(role: &RoleDescriptor) -> String {
    format!(
        "You are an AI hiring assistant. Write a warm, welcoming introduction for a candidate \
         applying for the {title} position. Briefly mention that this is an AI-assisted \
         first-round interview designed to be fair and objective. The role involves: {description}",
        title = role.title,
        description = role.description,
    )
}

pub fn questions(role: &RoleDescriptor, min: usize, max: usize) -> String {
    format!(
        "Based on the following job description for the {title} position, generate between \
         {min} and {max} concise interview questions covering both technical and behavioral \
         aspects. Return a numbered list with exactly one question per line, formatted as \
         \"1. question\", and no other introductory or concluding text.\n\n\
         Job description: {description}",
        title = role.title,
        description = role.description,
    )
}

pub fn evaluation(role: &RoleDescriptor, transcripts: &[TranscriptEntry]) -> String {
    let transcript = transcripts
        .iter()
        .map(|entry| {
            format!(
                "Question {}: {}\nAnswer: {}",
                entry.question_index + 1,
                entry.question_text,
                entry.transcript_text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "As an expert technical recruiter, analyze the following interview transcript for the \
         role of {title}. Provide a structured and objective evaluation using exactly these \
         three sections, in this order, each header on its own line:\n\n\
         Overall Summary: a brief paragraph on the candidate's performance and communication.\n\
         Strengths: 3-4 bullet points referencing the candidate's answers.\n\
         Areas for Improvement: 3-4 bullet points on weaknesses or topics to probe in a live interview.\n\n\
         Transcript:\n{transcript}",
        title = role.title,
    )
}
