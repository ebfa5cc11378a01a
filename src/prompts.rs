//! Prompt builders for the primary generators and the enhancer.

use std::fmt::Write as _;

use crate::profile::StartupProfile;

/// Questions at the front of a question set are investor-style; the rest
/// are industry-specific.
pub const INVESTOR_QUESTION_COUNT: usize = 7;

/// Criteria the enhanced evaluation report scores, in report order.
pub const EVALUATION_CRITERIA: [&str; 15] = [
    "Market Size & Opportunity",
    "Product-Market Fit",
    "Competitive Advantage",
    "Traction & Growth",
    "Revenue Model & Unit Economics",
    "Financial Health & Runway",
    "Team Strength & Experience",
    "Scalability Potential",
    "Technology & Innovation",
    "Customer Acquisition Strategy",
    "Risk Assessment",
    "Regulatory & Compliance",
    "ESG & Social Impact",
    "Investment Attractiveness",
    "Future Growth Potential",
];

fn numbered(items: &[String], start: usize) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", start + i, item);
    }
    out.trim_end().to_string()
}

fn profile_block(profile: &StartupProfile) -> String {
    format!(
        "Name: {}\nIndustry: {}\nPitch: {}\nFounded Year: {}\nFunding: {}",
        profile.name, profile.industry, profile.pitch, profile.founded_year, profile.funding
    )
}

fn profile_bullets(profile: &StartupProfile) -> String {
    format!(
        "- Name: {}\n- Industry: {}\n- Pitch: {}\n- Founded: {}\n- Funding: {}",
        profile.name, profile.industry, profile.pitch, profile.founded_year, profile.funding
    )
}

/// Instruction-formatted prompt for the question-generation adapter.
pub fn question_prompt(profile: &StartupProfile) -> String {
    format!(
        "<s>[INST] Analyze this startup:\n{}\n\n\
         Ask 10 smart questions (7 VC-style covering business model, traction, financials, \
         market, scalability, team and competition + 3 industry-specific). \
         Include 1 question to judge founder capability. Number each question. [/INST]\n",
        profile_block(profile)
    )
}

/// Instruction-formatted prompt for the evaluation adapter.
pub fn evaluation_prompt(profile: &StartupProfile, questions: &[String], answers: &[String]) -> String {
    let split = INVESTOR_QUESTION_COUNT.min(questions.len());
    let (investor, industry) = questions.split_at(split);

    format!(
        "<s>[INST] Evaluate this startup based on the information provided:\n\n\
         Startup Info:\n{}\n\n\
         VC Questions:\n{}\n\n\
         Industry-Specific Questions:\n{}\n\n\
         Founder Answers:\n{}\n\n\
         Provide a startup evaluation covering key business metrics, traction, team, \
         market potential, and risks. [/INST]\n",
        profile_block(profile),
        numbered(investor, 1),
        numbered(industry, split + 1),
        numbered(answers, 1),
    )
}

/// Asks the enhancer to refine a primary question set into exactly ten.
pub fn question_enhancement_prompt(profile: &StartupProfile, raw_questions: &[String]) -> String {
    format!(
        "You are a senior VC partner. Review and enhance these AI-generated questions for \
         evaluating a startup.\n\n\
         STARTUP INFORMATION:\n{}\n\n\
         RAW AI-GENERATED QUESTIONS:\n{}\n\n\
         TASK: Provide exactly 10 refined, high-quality questions that follow this structure:\n\
         - 7 VC-style questions (business model, traction, financials, market, scalability, team, competition)\n\
         - 2 industry-specific questions (tailored to {})\n\
         - 1 founder capability question\n\n\
         REQUIREMENTS:\n\
         - Questions should be sharp, specific, and reveal key insights\n\
         - Avoid generic questions; make them relevant to this specific startup\n\
         - Focus on metrics, data, and concrete evidence\n\
         - Number each question 1-10\n\n\
         Provide only the 10 refined questions, numbered 1-10.",
        profile_bullets(profile),
        numbered(raw_questions, 1),
        profile.industry,
    )
}

/// Asks the enhancer to turn a raw evaluation into the scored 15-criterion report.
pub fn evaluation_enhancement_prompt(
    profile: &StartupProfile,
    questions: &[String],
    answers: &[String],
    raw_evaluation: &str,
) -> String {
    let criteria: Vec<String> = EVALUATION_CRITERIA.iter().map(|c| c.to_string()).collect();

    format!(
        "You are a senior VC analyst with 15+ years of experience evaluating startups. Based on \
         the startup information and raw evaluation below, create a comprehensive, professional \
         startup evaluation report.\n\n\
         STARTUP INFORMATION:\n{}\n\n\
         QUESTIONS ASKED:\n{}\n\n\
         FOUNDER'S ANSWERS:\n{}\n\n\
         RAW AI EVALUATION:\n{}\n\n\
         TASK: Create a structured VC-style evaluation report covering these 15 key metrics \
         (provide score 1-10, strength, weakness, and improvement tip for each):\n\n{}\n\n\
         FORMAT REQUIREMENTS:\n\
         - Start with \"STARTUP EVALUATION REPORT\" as header\n\
         - For each metric: \"X. [Metric Name]: [Score]/10 — [Analysis]. Strength: [specific strength]. \
         Weakness: [specific weakness]. Improvement: [actionable tip].\"\n\
         - End with an \"Overall Assessment\" paragraph (6-8 lines with investment recommendation)\n\
         - Be specific, use data from the answers, and keep a professional VC tone\n",
        profile_bullets(profile),
        numbered(questions, 1),
        numbered(answers, 1),
        raw_evaluation.trim(),
        numbered(&criteria, 1),
    )
}

/// Fixed probe used to check enhancer reachability.
pub const CONNECTION_TEST_PROMPT: &str =
    "Hello! Just testing the connection. Please respond with 'Connection successful!'";
