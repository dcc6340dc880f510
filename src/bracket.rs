use std::fmt;

use serde::Serialize;

use crate::error::InsufficientData;
use crate::ranking::{RankKind, RankedRecord};
use crate::table::{OutputTable, Tabular, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Round {
    PlayIn,
    Semifinal,
    Final,
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Round::PlayIn => "Play-In",
            Round::Semifinal => "Semifinal",
            Round::Final => "Final",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Seed {
    pub seed: u32,
    pub team: String,
    /// Standings rank the seed came from; ties can share a rank.
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Slot {
    Seed(Seed),
    /// Filled by the winner of the game with this id.
    WinnerOf(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BracketGame {
    pub id: usize,
    pub round: Round,
    pub top: Slot,
    pub bottom: Slot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bracket {
    pub seeds: Vec<Seed>,
    pub games: Vec<BracketGame>,
}

impl Bracket {
    fn slot_label(&self, slot: &Slot) -> String {
        match slot {
            Slot::Seed(seed) => format!("({}) {}", seed.seed, seed.team),
            Slot::WinnerOf(id) => match self.games.iter().find(|g| g.id == *id) {
                Some(game) => format!("Winner of {} {}", game.round, game.id),
                None => format!("Winner of game {id}"),
            },
        }
    }
}

/// Seed the top `seeds` teams of ranked standings into a bracket. With five
/// seeds, 4 and 5 meet in a play-in and the winner faces the top seed; with
/// four, 1 plays 4 directly. Seeds 2 and 3 always meet in the other semifinal.
/// `seeds` outside 4..=5 is clamped into that range.
pub fn build_bracket(standings: &[RankedRecord], seeds: usize) -> Result<Bracket, InsufficientData> {
    let seeds = seeds.clamp(4, 5);
    if standings.len() < seeds {
        return Err(InsufficientData {
            available: standings.len(),
            required: seeds,
        });
    }
    let seeded: Vec<Seed> = standings
        .iter()
        .take(seeds)
        .enumerate()
        .map(|(idx, row)| Seed {
            seed: idx as u32 + 1,
            team: row.record.team.clone(),
            rank: row.rank(RankKind::Standing),
        })
        .collect();
    let seed = |n: usize| Slot::Seed(seeded[n - 1].clone());

    let mut games = Vec::new();
    let top_semi_opponent = if seeds == 5 {
        games.push(BracketGame {
            id: 1,
            round: Round::PlayIn,
            top: seed(4),
            bottom: seed(5),
        });
        Slot::WinnerOf(1)
    } else {
        seed(4)
    };
    let semi_a = games.len() + 1;
    games.push(BracketGame {
        id: semi_a,
        round: Round::Semifinal,
        top: seed(1),
        bottom: top_semi_opponent,
    });
    let semi_b = games.len() + 1;
    games.push(BracketGame {
        id: semi_b,
        round: Round::Semifinal,
        top: seed(2),
        bottom: seed(3),
    });
    games.push(BracketGame {
        id: games.len() + 1,
        round: Round::Final,
        top: Slot::WinnerOf(semi_a),
        bottom: Slot::WinnerOf(semi_b),
    });

    Ok(Bracket {
        seeds: seeded,
        games,
    })
}

impl Tabular for Bracket {
    fn to_table(&self) -> OutputTable {
        let mut out = OutputTable::new(&["game", "round", "top", "bottom"]);
        for game in &self.games {
            out.push(vec![
                Value::from(game.id),
                Value::from(game.round.to_string()),
                Value::from(self.slot_label(&game.top)),
                Value::from(self.slot_label(&game.bottom)),
            ]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::rank_standings;
    use crate::records::{Metric, TeamRecord};

    fn standings(n: usize) -> Vec<RankedRecord> {
        let records: Vec<TeamRecord> = (0..n)
            .map(|i| TeamRecord::new(format!("Team {}", i + 1)).with(Metric::WinPct, 90.0 - i as f64))
            .collect();
        rank_standings(&records)
    }

    #[test]
    fn five_seeds_get_a_play_in() {
        let bracket = build_bracket(&standings(8), 5).unwrap();
        assert_eq!(bracket.seeds.len(), 5);
        let play_in = &bracket.games[0];
        assert_eq!(play_in.round, Round::PlayIn);
        assert!(matches!(&play_in.top, Slot::Seed(s) if s.seed == 4));
        assert!(matches!(&play_in.bottom, Slot::Seed(s) if s.seed == 5));
        assert_eq!(bracket.games[1].bottom, Slot::WinnerOf(1));
        let last = bracket.games.last().unwrap();
        assert_eq!(last.round, Round::Final);
        assert_eq!(last.top, Slot::WinnerOf(2));
        assert_eq!(last.bottom, Slot::WinnerOf(3));
    }

    #[test]
    fn four_seeds_skip_the_play_in() {
        let bracket = build_bracket(&standings(4), 4).unwrap();
        assert_eq!(bracket.games.len(), 3);
        assert!(bracket.games.iter().all(|g| g.round != Round::PlayIn));
        let table = bracket.to_table();
        assert_eq!(table.get(0, "bottom"), Some(&Value::from("(4) Team 4")));
    }

    #[test]
    fn short_league_is_insufficient() {
        assert_eq!(
            build_bracket(&standings(3), 5),
            Err(InsufficientData {
                available: 3,
                required: 5
            })
        );
    }
}
