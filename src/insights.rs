use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Number of cards shown per day.
pub const DAILY_INSIGHT_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub title: &'static str,
    pub text: &'static str,
}

pub static INSIGHTS: &[Insight] = &[
    Insight {
        title: "Revelation",
        text: "The Quran was revealed over a period of 23 years, providing guidance for every aspect of life.",
    },
    Insight {
        title: "Preservation",
        text: "It is the only religious text preserved in its exact original language for over 1,400 years.",
    },
    Insight {
        title: "The Shortest Surah",
        text: "Surah Al-Kawthar is the shortest surah in the Quran, consisting of only three verses.",
    },
    Insight {
        title: "Heart of the Quran",
        text: "Surah Yasin is often referred to as the 'Heart of the Quran' for its profound spiritual depth.",
    },
    Insight {
        title: "Scientific Fact: Water",
        text: "The Quran mentions that every living thing is made of water (21:30), a fact confirmed by modern biology.",
    },
    Insight {
        title: "Scientific Fact: Mountains",
        text: "Mountains are described as 'pegs' (78:7), which matches the geological discovery of deep roots under mountains.",
    },
    Insight {
        title: "Scientific Fact: Iron",
        text: "Surah Al-Hadid (Iron) mentions iron was 'sent down' (57:25), aligning with the fact that iron originated from space.",
    },
    Insight {
        title: "The Only Woman Named",
        text: "Maryam (Mary) is the only woman mentioned by name in the Quran, with an entire chapter named after her.",
    },
    Insight {
        title: "Universal Message",
        text: "The Quran addresses all of humanity, emphasize justice, mercy, and the oneness of the Creator.",
    },
    Insight {
        title: "Expansion of the Universe",
        text: "The Quran mentions the universe is expanding (51:47), a discovery made by Edwin Hubble in the 20th century.",
    },
    Insight {
        title: "The Bee",
        text: "Surah An-Nahl describes the bee's complex behavior and the healing properties of honey (16:68-69).",
    },
    Insight {
        title: "Deep Sea Waves",
        text: "The Quran describes internal waves in the deep ocean (24:40), a phenomenon only recently discovered by scientists.",
    },
    Insight {
        title: "Embryology",
        text: "The stages of human development in the womb are described with remarkable accuracy in Surah Al-Mu'minun (23:12-14).",
    },
    Insight {
        title: "The Sky as a Shield",
        text: "The sky is described as a 'protected ceiling' (21:32), which corresponds to the protective functions of the atmosphere.",
    },
    Insight {
        title: "The Iron Chapter",
        text: "The atomic number of iron is 26, and the word 'Al-Hadid' has a numerical value of 26 in some counting systems.",
    },
    Insight {
        title: "The Ants",
        text: "Surah An-Naml mentions ants communicating with each other (27:18), consistent with modern entomology.",
    },
    Insight {
        title: "Fingerprints",
        text: "The Quran mentions the ability to restore even the very fingertips (75:4), alluding to the uniqueness of fingerprints.",
    },
    Insight {
        title: "The Two Seas",
        text: "The mention of two seas that meet but do not mix (55:19-20) describes the physical phenomenon of haloclines.",
    },
    Insight {
        title: "Skin Receptors",
        text: "The Quran mentions that skin is the site for feeling pain (4:56), which aligns with the discovery of pain receptors.",
    },
    Insight {
        title: "Frontal Lobe",
        text: "The 'lying, sinning forelock' (96:15-16) refers to the prefrontal cortex, the area responsible for decision-making.",
    },
    Insight {
        title: "Creation in Pairs",
        text: "The Quran states that all things were created in pairs (51:49), including plants, animals, and even particles.",
    },
    Insight {
        title: "Solar Orbit",
        text: "The Quran mentions that the sun and moon move in orbits (21:33), confirming the motion of celestial bodies.",
    },
    Insight {
        title: "Wind and Pollination",
        text: "Winds are described as 'fecundating' (15:22), referring to their role in pollinating plants and forming clouds.",
    },
    Insight {
        title: "The Living and Dead",
        text: "The cycle of life and death is mentioned many times, reflecting the biological continuity of nature.",
    },
    Insight {
        title: "Justice",
        text: "Justice is a core theme, with the Quran enjoining believers to stand firmly for justice, even against themselves (4:135).",
    },
    Insight {
        title: "Mercy",
        text: "The attribute of Mercy (Ar-Rahman) is emphasized more than any other quality of the Creator in the Quran.",
    },
];

/// Date-derived seed, e.g. 2026-03-01 becomes 20260301.
pub fn date_seed(date: NaiveDate) -> u64 {
    date.year() as u64 * 10_000 + date.month() as u64 * 100 + date.day() as u64
}

/// Picks today's cards: the i-th pick is `(seed + i * 7) % remaining`, removed
/// from the pool so a card appears at most once.
pub fn daily_selection(pool: &[Insight], date: NaiveDate, count: usize) -> Vec<Insight> {
    let seed = date_seed(date);
    let mut remaining = pool.to_vec();
    let picks = count.min(remaining.len());
    (0..picks)
        .map(|i| {
            let index = ((seed + i as u64 * 7) % remaining.len() as u64) as usize;
            remaining.remove(index)
        })
        .collect()
}

pub fn daily_insights(date: NaiveDate) -> Vec<Insight> {
    daily_selection(INSIGHTS, date, DAILY_INSIGHT_COUNT)
}
