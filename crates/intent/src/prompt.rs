//! Prompt construction

use swapdesk_core::TokenRegistry;

use crate::completion::ChatMessage;

const INSTRUCTIONS: &str = "\
You are an assistant that helps users interact with a Uniswap-like exchange.
Parse the user request and extract the operation, the tokens and their amounts.

Available operations:
- swap: exchange one token for another (first token is the one sold)
- deposit: add liquidity to a token pair pool
- redeem: remove liquidity from a token pair pool

Examples:
- \"swap 10 WETH for TEST\": swap, tokens WETH (amount 10) then TEST
- \"deposit 5 WETH and 20 TEST\": deposit, tokens WETH (amount 5) then TEST (amount 20)
- \"redeem 50% of my WETH-TEST position\": redeem, tokens WETH (amount 0.5) then TEST
- \"swap 100 usdc for eth\": swap, tokens USDC (amount 100) then ETH

Report symbols exactly as the user wrote them, even if they are not in the list.
Leave amounts null when the user did not give one; never invent them.";

/// System and user messages for one request
pub fn build_prompt(text: &str, registry: &TokenRegistry) -> Vec<ChatMessage> {
    let tokens = if registry.is_empty() {
        "- (none configured)".to_string()
    } else {
        registry
            .tokens()
            .iter()
            .map(|t| format!("- {} ({})", t.symbol, t.address))
            .collect::<Vec<_>>()
            .join("\n")
    };

    vec![
        ChatMessage::system(format!(
            "{}\n\nTokens known to the exchange:\n{}",
            INSTRUCTIONS, tokens
        )),
        ChatMessage::user(text.trim()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use swapdesk_core::Token;

    #[test]
    fn test_prompt_lists_registry_tokens() {
        let registry = TokenRegistry::new(vec![
            Token::new(Address::repeat_byte(0x0a), "WETH"),
            Token::new(Address::repeat_byte(0x0b), "TEST"),
        ]);
        let messages = build_prompt("  swap 1 WETH for TEST ", &registry);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        let system = messages[0].content.to_lowercase();
        assert!(system.contains("- weth (0x0a0a"));
        assert!(system.contains("- test (0x0b0b"));
        assert_eq!(messages[1].content, "swap 1 WETH for TEST");
    }

    #[test]
    fn test_prompt_with_empty_registry() {
        let messages = build_prompt("swap", &TokenRegistry::default());
        assert!(messages[0].content.contains("(none configured)"));
    }
}
