//! Static business content and system-instruction derivation.
//!
//! The system instruction is a pure function of the fixed business plan plus
//! whatever supplementary context the CEO has supplied through the operator
//! panel. It is rebuilt from scratch on every session start so a stale
//! instruction can never be sent.

pub const INVESTMENT_LINK: &str = "https://invest.alpharose-tx.com";

pub const INITIAL_GREETING: &str = "Hello! I'm the AlphaRose Therapeutics investor assistant. \
Ask me anything about the company, our pipeline, or the investment opportunity.";

pub const BUSINESS_PLAN_TEXT: &str = "\
AlphaRose Therapeutics is a clinical-stage biotechnology company developing \
targeted small-molecule therapies for rare autoimmune disorders.

Lead program: ART-101, an oral selective JAK1 modulator for refractory \
cutaneous lupus, currently completing Phase 2a with topline data expected \
next year. Secondary program ART-204 targets IgA nephropathy and is in \
IND-enabling studies.

Market: the addressable market for the lead indication exceeds $2.4B \
annually, with no approved oral therapy today. ART-101 holds orphan drug \
designation in the US and EU.

Team: founded by a leadership group with three prior approved products and \
two successful exits. 28 full-time employees, headquartered in Boston.

Financials: $18M raised to date across seed and Series A. The current round \
seeks $40M to fund the Phase 2b readout and expand manufacturing \
partnerships. Existing investors have committed to 30% of the round.";

/// Builds the full system instruction sent with every new chat session.
/// `operator_context` overrides or supplements the business plan when the
/// CEO has provided more current information.
pub fn build_system_instruction(operator_context: &str) -> String {
    let context = if operator_context.trim().is_empty() {
        "No additional context from the CEO at this moment."
    } else {
        operator_context
    };

    format!(
        "You are AlphaRose AI, an intelligent assistant for AlphaRose Therapeutics.\n\
Your primary goal is to inform potential investors about the company based on the \
provided business plan and any additional context from the CEO.\n\
You should also act as a sales agent, encouraging investment and directing users to \
{INVESTMENT_LINK} when appropriate.\n\
Be professional, knowledgeable, concise, and persuasive. Keep your answers focused \
and to the point.\n\
\n\
Business Plan Information:\n\
---\n\
{BUSINESS_PLAN_TEXT}\n\
---\n\
\n\
Additional Context/Key Talking Points from CEO (use this to supplement or override \
business plan info if more current):\n\
---\n\
{context}\n\
---\n\
\n\
When a user asks a question, use all the above information to formulate your answer.\n\
If a topic seems relevant to investment or showcases strong potential, gently guide \
the conversation towards the investment opportunity.\n\
Always provide the investment link ({INVESTMENT_LINK}) if the user expresses interest \
in investing, asks how to invest, or if you are summarizing key investment highlights.\n\
Do not make up information. If the answer is not in the provided materials, state \
that you don't have that specific information.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::{build_system_instruction, BUSINESS_PLAN_TEXT, INVESTMENT_LINK};

    #[test]
    fn instruction_embeds_business_plan_and_link() {
        let instruction = build_system_instruction("");
        assert!(instruction.contains(BUSINESS_PLAN_TEXT));
        assert!(instruction.contains(INVESTMENT_LINK));
    }

    #[test]
    fn instruction_embeds_operator_context_verbatim() {
        let instruction = build_system_instruction("Series B oversubscribed as of Monday.");
        assert!(instruction.contains("Series B oversubscribed as of Monday."));
        assert!(!instruction.contains("No additional context"));
    }

    #[test]
    fn empty_context_gets_explicit_placeholder() {
        for context in ["", "   ", "\n"] {
            let instruction = build_system_instruction(context);
            assert!(instruction.contains("No additional context from the CEO"));
        }
    }
}
