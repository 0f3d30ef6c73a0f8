// Minimal ABI plumbing for the protocol calls and events this service
// consumes. Only static-width arguments and one dynamic return shape
// (the mint-history array) ever cross this boundary, so the encoding is
// done by hand rather than through a full ABI codec.

use alloy_primitives::{keccak256, Address, B256};

pub const WORD: usize = 32;

/// 4-byte function selector for a canonical signature,
/// e.g. `transfer(address,uint256)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// topic0 for a canonical event signature,
/// e.g. `Transfer(address,address,uint256)`.
pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// An address as an indexed-argument topic: left-padded to 32 bytes.
pub fn address_topic(addr: Address) -> B256 {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(addr.as_slice());
    B256::from(word)
}

pub fn encode_address(addr: Address) -> [u8; WORD] {
    address_topic(addr).0
}

pub fn encode_u128(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

pub fn encode_bool(value: bool) -> [u8; WORD] {
    encode_u128(u128::from(value))
}

/// Calldata for a call with static arguments: selector + packed words.
pub fn calldata(signature: &str, args: &[[u8; WORD]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * WORD);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        data.extend_from_slice(arg);
    }
    data
}

/// Split return data into 32-byte words. A trailing partial word is dropped.
pub fn decode_words(data: &[u8]) -> Vec<[u8; WORD]> {
    data.chunks_exact(WORD)
        .map(|chunk| {
            let mut word = [0u8; WORD];
            word.copy_from_slice(chunk);
            word
        })
        .collect()
}

/// Low 16 bytes of a word as an amount. Token amounts here are 6-decimal
/// fixed point, far inside u128 range.
pub fn word_to_u128(word: &[u8; WORD]) -> u128 {
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&word[16..]);
    u128::from_be_bytes(buf)
}

pub fn word_to_u64(word: &[u8; WORD]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    u64::from_be_bytes(buf)
}

pub fn word_to_bool(word: &[u8; WORD]) -> bool {
    word.iter().any(|b| *b != 0)
}

pub fn word_to_address(word: &[u8; WORD]) -> Address {
    Address::from_slice(&word[12..])
}

/// One entry of a stablecoin's on-chain mint history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRecord {
    /// 6-decimal fixed point.
    pub amount: u128,
    /// Unix seconds.
    pub timestamp: i64,
    pub block_number: u64,
}

/// Decode the `getUserMintHistory` return value: an ABI-encoded dynamic
/// array of `(amount, timestamp, blockNumber)` tuples. Malformed data
/// degrades to the records that do decode, never an error.
pub fn decode_mint_history(data: &[u8]) -> Vec<MintRecord> {
    let words = decode_words(data);
    if words.len() < 2 {
        return Vec::new();
    }

    // head: offset to the array, then its length, then 3 words per record
    let offset_words = word_to_u64(&words[0]) as usize / WORD;
    let Some(len_word) = words.get(offset_words) else {
        return Vec::new();
    };
    let len = word_to_u64(len_word) as usize;

    let mut records = Vec::with_capacity(len);
    for i in 0..len {
        let base = offset_words + 1 + i * 3;
        let (Some(amount), Some(timestamp), Some(block_number)) =
            (words.get(base), words.get(base + 1), words.get(base + 2))
        else {
            break;
        };
        records.push(MintRecord {
            amount: word_to_u128(amount),
            timestamp: word_to_u64(timestamp) as i64,
            block_number: word_to_u64(block_number),
        });
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn well_known_selectors() {
        // canonical ERC-20 selectors
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(selector("approve(address,uint256)"), [0x09, 0x5e, 0xa7, 0xb3]);
    }

    #[test]
    fn transfer_event_topic_matches_erc20() {
        assert_eq!(
            format!("{:#x}", event_topic("Transfer(address,address,uint256)")),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a1c6f9f3ef"
        );
    }

    #[test]
    fn address_topic_round_trips() {
        let addr = address!("9e94BC6b8D81e94D5272d8e2F2BcCAC267C50E88");
        let topic = address_topic(addr);
        assert_eq!(word_to_address(&topic.0), addr);
        assert!(topic.0[..12].iter().all(|b| *b == 0));
    }

    #[test]
    fn words_encode_and_decode() {
        assert_eq!(word_to_u128(&encode_u128(1_500_000)), 1_500_000);
        assert_eq!(word_to_u64(&encode_u128(42)), 42);
        assert!(word_to_bool(&encode_bool(true)));
        assert!(!word_to_bool(&encode_bool(false)));
    }

    #[test]
    fn calldata_packs_selector_and_words() {
        let data = calldata(
            "balanceOf(address)",
            &[encode_address(address!("9e94BC6b8D81e94D5272d8e2F2BcCAC267C50E88"))],
        );
        assert_eq!(data.len(), 4 + WORD);
        assert_eq!(&data[..4], &[0x70, 0xa0, 0x82, 0x31]);
    }

    fn encoded_mint_history(records: &[(u128, u64, u64)]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&encode_u128(WORD as u128)); // offset
        data.extend_from_slice(&encode_u128(records.len() as u128));
        for (amount, ts, block) in records {
            data.extend_from_slice(&encode_u128(*amount));
            data.extend_from_slice(&encode_u128(*ts as u128));
            data.extend_from_slice(&encode_u128(*block as u128));
        }
        data
    }

    #[test]
    fn decodes_mint_history() {
        let data = encoded_mint_history(&[(5_000_000, 1_700_000_000, 120), (250_000, 1_700_000_060, 121)]);
        let records = decode_mint_history(&data);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].amount, 5_000_000);
        assert_eq!(records[0].timestamp, 1_700_000_000);
        assert_eq!(records[1].block_number, 121);
    }

    #[test]
    fn malformed_mint_history_degrades_to_empty() {
        assert!(decode_mint_history(&[]).is_empty());
        assert!(decode_mint_history(&[0u8; 16]).is_empty());
        // length claims more records than the data carries
        let mut data = encoded_mint_history(&[(1, 1, 1)]);
        data[63] = 9;
        assert_eq!(decode_mint_history(&data).len(), 1);
    }
}
