use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::text::{fold_char, is_han};

/// Built-in syllable initials for characters common in lesson titles and
/// descriptions (subjects, grades, zone names, classroom tools, numerals).
/// Polyphonic characters use their most frequent reading in this domain.
const BUILTIN_INITIALS: &[(char, &str)] = &[
    ('a', "安案爱暗奥"),
    ('b', "八百半办包保报北备倍本比笔边变标表别并不步部白班板版被"),
    ('c', "才材彩参测层差查长常场超车成乘程池尺出初除处传窗创词次从错称抽猜"),
    ('d', "大代带单当导到道得的等低底地点电调定动度短段对多读独答打第都"),
    ('e', "二儿而"),
    ('f', "发法反方放分份风夫符幅服复父赋"),
    ('g', "改概干高告格个各给根更工公共构估古故关观管规国果过刚"),
    ('h', "还孩海函好号合和何盒黑很红后互花划画化话换黄回会活火获"),
    ('j', "几机积基级即极集计记纪际加家价架间简减建见件讲奖交角脚教较接节结解介今进近经精九久旧就局举句具据距卷绝均践觉"),
    ('k', "卡开看考科可课空口块快框"),
    ('l', "拉来蓝老乐类累冷离理里力立例连练量两亮列林零领另六流龙路录率轮论逻了"),
    ('m', "马码买卖满慢毛么没每美门米面秒描民名明模目木"),
    ('n', "拿哪那内能你年念鸟您牛农女"),
    ('o', "偶欧"),
    ('p', "爬排盘判旁跑配朋批皮片拼平评屏破普"),
    ('q', "七期其奇骑起气器千前钱强桥切亲青轻清情请秋求球区曲取去趣全缺确群圈签"),
    ('r', "然让热人认任日容如入软"),
    ('s', "三色沙山闪上少设社身深什生声省剩师十时识实史使始式事视试是室收手首书输数术树双水顺说思四送算随岁所素速"),
    ('t', "他她它台太谈探讨特题体天填条跳听通同统图土团推"),
    ('w', "外完玩万网往望微为位文问我无五午物误"),
    ('x', "西习系下先现线相想向项象像小校效笑些写谢心新信星行形型性兴修需选学雪寻训"),
    ('y', "呀亚言研颜眼演验样要也页业一衣医移已以义亿艺意因音引应英影用优由有又右鱼与语元员原圆远院约月阅云运"),
    ('z', "在再早怎增展张找照者这真整正证之知直值指只纸至制质智中钟种重周主助注专转装准桌字自总走组最作坐做综"),
];

/// Static per-character initial table used for abbreviated-input matching.
///
/// Maps a character (typically a CJK ideograph) to the lowercase latin
/// initial of its syllable, e.g. `数 -> s`.
#[derive(Debug, Clone, Default)]
pub struct InitialsTable {
    map: HashMap<char, char>,
}

impl InitialsTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (initial, chars) in BUILTIN_INITIALS {
            table.insert_group(*initial, chars);
        }
        table
    }

    /// Parse a JSON object of `{ "<initial>": "<chars>" }`
    pub fn from_json(json: &str) -> Result<Self> {
        let groups: BTreeMap<String, String> =
            serde_json::from_str(json).context("Failed to parse initials table JSON")?;

        let mut table = Self::empty();
        for (key, chars) in groups {
            let mut key_chars = key.chars();
            let initial = match (key_chars.next(), key_chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => c.to_ascii_lowercase(),
                _ => anyhow::bail!("Initials table key must be a single ASCII letter: {key:?}"),
            };
            table.insert_group(initial, &chars);
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read initials table {path:?}"))?;
        let table = Self::from_json(&content)?;
        info!("Loaded {} initials from {:?}", table.len(), path);
        Ok(table)
    }

    /// Merge another table over this one; entries in `other` win
    pub fn extend(&mut self, other: InitialsTable) {
        debug!("Extending initials table with {} entries", other.len());
        self.map.extend(other.map);
    }

    pub fn insert(&mut self, c: char, initial: char) {
        self.map.insert(c, initial.to_ascii_lowercase());
    }

    fn insert_group(&mut self, initial: char, chars: &str) {
        for c in chars.chars().filter(|c| !c.is_whitespace()) {
            self.insert(c, initial);
        }
    }

    pub fn initial_of(&self, c: char) -> Option<char> {
        self.map.get(&c).copied()
    }

    pub fn contains(&self, c: char) -> bool {
        self.map.contains_key(&c)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Concatenated initials of `text`.
    ///
    /// Table characters contribute their initial. Runs of ASCII letters or
    /// digits contribute their first char (lowercased). Everything else,
    /// including ideographs missing from the table, contributes nothing and
    /// ends the current word.
    pub fn initials_of(&self, text: &str) -> String {
        let mut initials = String::new();
        let mut in_word = false;

        for c in text.chars() {
            if c.is_ascii_alphanumeric() {
                if !in_word {
                    initials.push(fold_char(c));
                    in_word = true;
                }
                continue;
            }

            in_word = false;
            if let Some(initial) = self.initial_of(c) {
                initials.push(initial);
            }
        }

        initials
    }

    /// Whether `text` holds characters the initials path applies to
    pub fn has_non_latin(&self, text: &str) -> bool {
        text.chars().any(|c| is_han(c) || self.contains(c))
    }
}
