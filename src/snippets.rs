//! Built-in code snippets and the search used by the snippet manager.

use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Snippet {
    pub title: &'static str,
    pub language: &'static str,
    pub code: &'static str,
    pub likes: u32,
    pub author: &'static str,
}

const CATALOGUE: &[Snippet] = &[
    Snippet {
        title: "React useLocalStorage Hook",
        language: "TypeScript",
        code: "function useLocalStorage<T>(key: string, initial: T) {\n  const [value, setValue] = useState<T>(() => {\n    const raw = localStorage.getItem(key);\n    return raw ? JSON.parse(raw) : initial;\n  });\n  useEffect(() => {\n    localStorage.setItem(key, JSON.stringify(value));\n  }, [key, value]);\n  return [value, setValue] as const;\n}",
        likes: 128,
        author: "DevExpert",
    },
    Snippet {
        title: "Async Function with Error Handling",
        language: "JavaScript",
        code: "async function fetchData(url) {\n  try {\n    const response = await fetch(url);\n    if (!response.ok) {\n      throw new Error(`HTTP error ${response.status}`);\n    }\n    return await response.json();\n  } catch (error) {\n    console.error('fetch failed:', error);\n    throw error;\n  }\n}",
        likes: 95,
        author: "AsyncMaster",
    },
    Snippet {
        title: "React Query Custom Hook",
        language: "TypeScript",
        code: "function useFetchData<T>(url: string) {\n  return useQuery({\n    queryKey: ['data', url],\n    queryFn: async (): Promise<T> => {\n      const res = await fetch(url);\n      if (!res.ok) throw new Error(res.statusText);\n      return res.json();\n    },\n  });\n}",
        likes: 72,
        author: "QueryMaster",
    },
    Snippet {
        title: "Tailwind CSS Animation",
        language: "CSS",
        code: "@keyframes fadeIn {\n  from { opacity: 0; transform: translateY(10px); }\n  to { opacity: 1; transform: translateY(0); }\n}\n\n.animate-fade-in {\n  animation: fadeIn 0.3s ease-in-out forwards;\n}",
        likes: 63,
        author: "CSSWizard",
    },
];

pub fn catalogue() -> &'static [Snippet] {
    CATALOGUE
}

/// Case-insensitive substring match on title, language or code. A blank term matches everything.
pub fn search<'a>(items: &'a [Snippet], term: &str) -> Vec<&'a Snippet> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|s| {
            s.title.to_lowercase().contains(&term)
                || s.language.to_lowercase().contains(&term)
                || s.code.to_lowercase().contains(&term)
        })
        .collect()
}

/// Language tab filter; `"all"` keeps everything.
pub fn by_language<'a>(items: Vec<&'a Snippet>, tab: &str) -> Vec<&'a Snippet> {
    let tab = tab.trim();
    if tab.is_empty() || tab.eq_ignore_ascii_case("all") {
        return items;
    }
    items
        .into_iter()
        .filter(|s| s.language.eq_ignore_ascii_case(tab))
        .collect()
}
