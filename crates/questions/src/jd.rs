//! Job-description analysis: one LLM call that distills a free-text JD into
//! structured topic sets driving both rounds of question generation.

use tracing::warn;

use vetta_llm::{extract_json_output, ModelRouter};
use vetta_store::schema::JdAnalysis;

use crate::INTERVIEWER_SYSTEM_PROMPT;

pub async fn analyze_job_description(
    router: &ModelRouter,
    job_description: &str,
    job_title: &str,
) -> JdAnalysis {
    let prompt = format!(
        "Analyze this Job Description and extract structured information.\n\n\
         Job Title: {job_title}\n\
         Job Description:\n{job_description}\n\n\
         Return ONLY a JSON object:\n\
         {{\n\
           \"required_skills\": [\"skill1\", \"skill2\"],\n\
           \"key_responsibilities\": [\"resp1\", \"resp2\"],\n\
           \"tools_and_frameworks\": [\"tool1\", \"tool2\"],\n\
           \"soft_skills\": [\"soft1\", \"soft2\"],\n\
           \"experience_expectations\": \"summary of expected experience\",\n\
           \"technical_topics\": [\"topic1\", \"topic2\"],\n\
           \"hr_topics\": [\"topic1\", \"topic2\"]\n\
         }}"
    );

    let system = format!(
        "{INTERVIEWER_SYSTEM_PROMPT}\n\nYou are a JD analysis expert. Return valid JSON only."
    );
    let response = router.generate(&prompt, &system, false).await;

    let parsed = extract_json_output::<JdAnalysis>(&response)
        .filter(|analysis| !analysis.required_skills.is_empty() || !analysis.technical_topics.is_empty());

    parsed.unwrap_or_else(|| {
        warn!(job_title, "jd analysis unparsable; using generic fallback");
        fallback_analysis(job_title)
    })
}

fn fallback_analysis(job_title: &str) -> JdAnalysis {
    JdAnalysis {
        required_skills: vec![
            job_title.to_string(),
            "problem-solving".to_string(),
            "communication".to_string(),
        ],
        key_responsibilities: vec![
            "Perform role duties".to_string(),
            "Collaborate with team".to_string(),
        ],
        tools_and_frameworks: Vec::new(),
        soft_skills: vec![
            "teamwork".to_string(),
            "communication".to_string(),
            "leadership".to_string(),
        ],
        experience_expectations: "Relevant industry experience".to_string(),
        technical_topics: vec![job_title.to_string()],
        hr_topics: vec![
            "motivation".to_string(),
            "teamwork".to_string(),
            "conflict resolution".to_string(),
        ],
    }
}
