use chess::rules::legal_uci_moves;
use chess::{replay, PositionLedger, START_FEN};
use proptest::prelude::*;

/// Turn a list of choice indices into a legal game by picking among the legal
/// moves at each step.
fn playout(choices: &[u8]) -> Vec<String> {
    let mut fen = START_FEN.to_string();
    let mut moves = Vec::new();
    for &choice in choices {
        let legal = legal_uci_moves(&fen).unwrap();
        if legal.is_empty() {
            break;
        }
        let uci = legal[choice as usize % legal.len()].clone();
        fen = chess::rules::apply_move(&fen, &uci).unwrap();
        moves.push(uci);
    }
    moves
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn position_at_matches_independent_replay(choices in prop::collection::vec(any::<u8>(), 0..40)) {
        let moves = playout(&choices);
        let ledger = PositionLedger::from_moves(START_FEN, &moves).unwrap();
        prop_assert_eq!(ledger.len(), moves.len());

        for k in 0..=moves.len() {
            let expected = replay(START_FEN, &moves, k).unwrap();
            let first = ledger.position_at(k).unwrap();
            let second = ledger.position_at(k).unwrap();
            prop_assert_eq!(&first.fen, &expected);
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn stored_uci_replays_to_the_same_positions(choices in prop::collection::vec(any::<u8>(), 1..30)) {
        let moves = playout(&choices);
        let ledger = PositionLedger::from_moves(START_FEN, &moves).unwrap();
        let stored: Vec<String> = ledger.moves().iter().map(|m| m.uci.clone()).collect();
        prop_assert_eq!(&stored, &moves);

        let rebuilt = PositionLedger::from_moves(START_FEN, &stored).unwrap();
        prop_assert_eq!(
            rebuilt.position_at(rebuilt.len()).unwrap(),
            ledger.position_at(ledger.len()).unwrap()
        );
    }
}
