use common::{error::AppError, utils::generation::GenerationProvider};
use tracing::debug;

/// Join retrieved chunk texts into one context block, preserving retrieval
/// order.
pub fn build_context(chunks: &[String]) -> String {
    chunks.join(" ")
}

/// Fixed prompt template carrying the literal question and the context
/// block. An empty context still produces a prompt; missing context degrades
/// answer quality, it is not an error.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!("Question: {question}\nContext: {context}\nAnswer:")
}

/// Assemble the prompt and invoke the generative model, returning its text
/// verbatim.
pub async fn synthesize(
    generator: &GenerationProvider,
    question: &str,
    context_chunks: &[String],
) -> Result<String, AppError> {
    let context = build_context(context_chunks);
    let prompt = build_prompt(question, &context);
    debug!(
        context_chunks = context_chunks.len(),
        prompt_chars = prompt.chars().count(),
        "invoking generation model"
    );
    generator.complete(&prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_template_embeds_question_and_context() {
        let prompt = build_prompt("What is in my document?", "BBBBB");
        assert_eq!(
            prompt,
            "Question: What is in my document?\nContext: BBBBB\nAnswer:"
        );
    }

    #[test]
    fn context_is_space_joined_in_retrieval_order() {
        let chunks = vec!["second".to_owned(), "first".to_owned(), "third".to_owned()];
        assert_eq!(build_context(&chunks), "second first third");
    }

    #[test]
    fn empty_context_still_yields_a_prompt() {
        let prompt = build_prompt("anything?", &build_context(&[]));
        assert_eq!(prompt, "Question: anything?\nContext: \nAnswer:");
    }

    #[tokio::test]
    async fn model_response_is_returned_unchanged() {
        let generator = GenerationProvider::new_echo(Some("  verbatim, whitespace kept ".into()));
        let answer = synthesize(&generator, "q", &["ctx".to_owned()])
            .await
            .expect("synthesis failed");
        assert_eq!(answer, "  verbatim, whitespace kept ");
    }

    #[tokio::test]
    async fn echo_backend_sees_the_assembled_prompt() {
        let generator = GenerationProvider::new_echo(None);
        let answer = synthesize(
            &generator,
            "What is in my document?",
            &["BBBBB".to_owned(), "CCCCC".to_owned()],
        )
        .await
        .expect("synthesis failed");
        assert_eq!(
            answer,
            "Question: What is in my document?\nContext: BBBBB CCCCC\nAnswer:"
        );
    }
}
