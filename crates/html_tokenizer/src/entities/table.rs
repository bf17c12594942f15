//! Named character reference data, derived from the WHATWG table.
//!
//! Names appear exactly as they follow `&`: semicolon-terminated names keep
//! the `;`, and the legacy (semicolon-optional) set appears in both forms.
//! Values are one or two code points. The trie builder asserts there are no
//! duplicate names.

pub(super) const NAMED_REFS: &[(&str, &str)] = &[
    // Legacy set: these decode with or without the terminating semicolon.
    ("AElig", "\u{00C6}"),
    ("AElig;", "\u{00C6}"),
    ("AMP", "&"),
    ("AMP;", "&"),
    ("Aacute", "\u{00C1}"),
    ("Aacute;", "\u{00C1}"),
    ("Acirc", "\u{00C2}"),
    ("Acirc;", "\u{00C2}"),
    ("Agrave", "\u{00C0}"),
    ("Agrave;", "\u{00C0}"),
    ("Aring", "\u{00C5}"),
    ("Aring;", "\u{00C5}"),
    ("Atilde", "\u{00C3}"),
    ("Atilde;", "\u{00C3}"),
    ("Auml", "\u{00C4}"),
    ("Auml;", "\u{00C4}"),
    ("COPY", "\u{00A9}"),
    ("COPY;", "\u{00A9}"),
    ("Ccedil", "\u{00C7}"),
    ("Ccedil;", "\u{00C7}"),
    ("ETH", "\u{00D0}"),
    ("ETH;", "\u{00D0}"),
    ("Eacute", "\u{00C9}"),
    ("Eacute;", "\u{00C9}"),
    ("Ecirc", "\u{00CA}"),
    ("Ecirc;", "\u{00CA}"),
    ("Egrave", "\u{00C8}"),
    ("Egrave;", "\u{00C8}"),
    ("Euml", "\u{00CB}"),
    ("Euml;", "\u{00CB}"),
    ("GT", ">"),
    ("GT;", ">"),
    ("Iacute", "\u{00CD}"),
    ("Iacute;", "\u{00CD}"),
    ("Icirc", "\u{00CE}"),
    ("Icirc;", "\u{00CE}"),
    ("Igrave", "\u{00CC}"),
    ("Igrave;", "\u{00CC}"),
    ("Iuml", "\u{00CF}"),
    ("Iuml;", "\u{00CF}"),
    ("LT", "<"),
    ("LT;", "<"),
    ("Ntilde", "\u{00D1}"),
    ("Ntilde;", "\u{00D1}"),
    ("Oacute", "\u{00D3}"),
    ("Oacute;", "\u{00D3}"),
    ("Ocirc", "\u{00D4}"),
    ("Ocirc;", "\u{00D4}"),
    ("Ograve", "\u{00D2}"),
    ("Ograve;", "\u{00D2}"),
    ("Oslash", "\u{00D8}"),
    ("Oslash;", "\u{00D8}"),
    ("Otilde", "\u{00D5}"),
    ("Otilde;", "\u{00D5}"),
    ("Ouml", "\u{00D6}"),
    ("Ouml;", "\u{00D6}"),
    ("QUOT", "\""),
    ("QUOT;", "\""),
    ("REG", "\u{00AE}"),
    ("REG;", "\u{00AE}"),
    ("THORN", "\u{00DE}"),
    ("THORN;", "\u{00DE}"),
    ("Uacute", "\u{00DA}"),
    ("Uacute;", "\u{00DA}"),
    ("Ucirc", "\u{00DB}"),
    ("Ucirc;", "\u{00DB}"),
    ("Ugrave", "\u{00D9}"),
    ("Ugrave;", "\u{00D9}"),
    ("Uuml", "\u{00DC}"),
    ("Uuml;", "\u{00DC}"),
    ("Yacute", "\u{00DD}"),
    ("Yacute;", "\u{00DD}"),
    ("aacute", "\u{00E1}"),
    ("aacute;", "\u{00E1}"),
    ("acirc", "\u{00E2}"),
    ("acirc;", "\u{00E2}"),
    ("acute", "\u{00B4}"),
    ("acute;", "\u{00B4}"),
    ("aelig", "\u{00E6}"),
    ("aelig;", "\u{00E6}"),
    ("agrave", "\u{00E0}"),
    ("agrave;", "\u{00E0}"),
    ("amp", "&"),
    ("amp;", "&"),
    ("aring", "\u{00E5}"),
    ("aring;", "\u{00E5}"),
    ("atilde", "\u{00E3}"),
    ("atilde;", "\u{00E3}"),
    ("auml", "\u{00E4}"),
    ("auml;", "\u{00E4}"),
    ("brvbar", "\u{00A6}"),
    ("brvbar;", "\u{00A6}"),
    ("ccedil", "\u{00E7}"),
    ("ccedil;", "\u{00E7}"),
    ("cedil", "\u{00B8}"),
    ("cedil;", "\u{00B8}"),
    ("cent", "\u{00A2}"),
    ("cent;", "\u{00A2}"),
    ("copy", "\u{00A9}"),
    ("copy;", "\u{00A9}"),
    ("curren", "\u{00A4}"),
    ("curren;", "\u{00A4}"),
    ("deg", "\u{00B0}"),
    ("deg;", "\u{00B0}"),
    ("divide", "\u{00F7}"),
    ("divide;", "\u{00F7}"),
    ("eacute", "\u{00E9}"),
    ("eacute;", "\u{00E9}"),
    ("ecirc", "\u{00EA}"),
    ("ecirc;", "\u{00EA}"),
    ("egrave", "\u{00E8}"),
    ("egrave;", "\u{00E8}"),
    ("eth", "\u{00F0}"),
    ("eth;", "\u{00F0}"),
    ("euml", "\u{00EB}"),
    ("euml;", "\u{00EB}"),
    ("frac12", "\u{00BD}"),
    ("frac12;", "\u{00BD}"),
    ("frac14", "\u{00BC}"),
    ("frac14;", "\u{00BC}"),
    ("frac34", "\u{00BE}"),
    ("frac34;", "\u{00BE}"),
    ("gt", ">"),
    ("gt;", ">"),
    ("iacute", "\u{00ED}"),
    ("iacute;", "\u{00ED}"),
    ("icirc", "\u{00EE}"),
    ("icirc;", "\u{00EE}"),
    ("iexcl", "\u{00A1}"),
    ("iexcl;", "\u{00A1}"),
    ("igrave", "\u{00EC}"),
    ("igrave;", "\u{00EC}"),
    ("iquest", "\u{00BF}"),
    ("iquest;", "\u{00BF}"),
    ("iuml", "\u{00EF}"),
    ("iuml;", "\u{00EF}"),
    ("laquo", "\u{00AB}"),
    ("laquo;", "\u{00AB}"),
    ("lt", "<"),
    ("lt;", "<"),
    ("macr", "\u{00AF}"),
    ("macr;", "\u{00AF}"),
    ("micro", "\u{00B5}"),
    ("micro;", "\u{00B5}"),
    ("middot", "\u{00B7}"),
    ("middot;", "\u{00B7}"),
    ("nbsp", "\u{00A0}"),
    ("nbsp;", "\u{00A0}"),
    ("not", "\u{00AC}"),
    ("not;", "\u{00AC}"),
    ("ntilde", "\u{00F1}"),
    ("ntilde;", "\u{00F1}"),
    ("oacute", "\u{00F3}"),
    ("oacute;", "\u{00F3}"),
    ("ocirc", "\u{00F4}"),
    ("ocirc;", "\u{00F4}"),
    ("ograve", "\u{00F2}"),
    ("ograve;", "\u{00F2}"),
    ("ordf", "\u{00AA}"),
    ("ordf;", "\u{00AA}"),
    ("ordm", "\u{00BA}"),
    ("ordm;", "\u{00BA}"),
    ("oslash", "\u{00F8}"),
    ("oslash;", "\u{00F8}"),
    ("otilde", "\u{00F5}"),
    ("otilde;", "\u{00F5}"),
    ("ouml", "\u{00F6}"),
    ("ouml;", "\u{00F6}"),
    ("para", "\u{00B6}"),
    ("para;", "\u{00B6}"),
    ("plusmn", "\u{00B1}"),
    ("plusmn;", "\u{00B1}"),
    ("pound", "\u{00A3}"),
    ("pound;", "\u{00A3}"),
    ("quot", "\""),
    ("quot;", "\""),
    ("raquo", "\u{00BB}"),
    ("raquo;", "\u{00BB}"),
    ("reg", "\u{00AE}"),
    ("reg;", "\u{00AE}"),
    ("sect", "\u{00A7}"),
    ("sect;", "\u{00A7}"),
    ("shy", "\u{00AD}"),
    ("shy;", "\u{00AD}"),
    ("sup1", "\u{00B9}"),
    ("sup1;", "\u{00B9}"),
    ("sup2", "\u{00B2}"),
    ("sup2;", "\u{00B2}"),
    ("sup3", "\u{00B3}"),
    ("sup3;", "\u{00B3}"),
    ("szlig", "\u{00DF}"),
    ("szlig;", "\u{00DF}"),
    ("thorn", "\u{00FE}"),
    ("thorn;", "\u{00FE}"),
    ("times", "\u{00D7}"),
    ("times;", "\u{00D7}"),
    ("uacute", "\u{00FA}"),
    ("uacute;", "\u{00FA}"),
    ("ucirc", "\u{00FB}"),
    ("ucirc;", "\u{00FB}"),
    ("ugrave", "\u{00F9}"),
    ("ugrave;", "\u{00F9}"),
    ("uml", "\u{00A8}"),
    ("uml;", "\u{00A8}"),
    ("uuml", "\u{00FC}"),
    ("uuml;", "\u{00FC}"),
    ("yacute", "\u{00FD}"),
    ("yacute;", "\u{00FD}"),
    ("yen", "\u{00A5}"),
    ("yen;", "\u{00A5}"),
    ("yuml", "\u{00FF}"),
    ("yuml;", "\u{00FF}"),
    // Semicolon-only names.
    ("Afr;", "\u{1D504}"),
    ("Alpha;", "\u{0391}"),
    ("Aopf;", "\u{1D538}"),
    ("Ascr;", "\u{1D49C}"),
    ("Beta;", "\u{0392}"),
    ("Chi;", "\u{03A7}"),
    ("Dagger;", "\u{2021}"),
    ("Delta;", "\u{0394}"),
    ("Epsilon;", "\u{0395}"),
    ("Eta;", "\u{0397}"),
    ("Gamma;", "\u{0393}"),
    ("Hat;", "^"),
    ("Iota;", "\u{0399}"),
    ("Kappa;", "\u{039A}"),
    ("Lambda;", "\u{039B}"),
    ("Mu;", "\u{039C}"),
    ("NotEqualTilde;", "\u{2242}\u{0338}"),
    ("Nu;", "\u{039D}"),
    ("OElig;", "\u{0152}"),
    ("Omega;", "\u{03A9}"),
    ("Omicron;", "\u{039F}"),
    ("Phi;", "\u{03A6}"),
    ("Pi;", "\u{03A0}"),
    ("Prime;", "\u{2033}"),
    ("Psi;", "\u{03A8}"),
    ("Rho;", "\u{03A1}"),
    ("Scaron;", "\u{0160}"),
    ("Sigma;", "\u{03A3}"),
    ("Tau;", "\u{03A4}"),
    ("ThickSpace;", "\u{205F}\u{200A}"),
    ("Theta;", "\u{0398}"),
    ("Upsilon;", "\u{03A5}"),
    ("Xi;", "\u{039E}"),
    ("Yuml;", "\u{0178}"),
    ("Zeta;", "\u{0396}"),
    ("afr;", "\u{1D51E}"),
    ("alefsym;", "\u{2135}"),
    ("alpha;", "\u{03B1}"),
    ("and;", "\u{2227}"),
    ("ang;", "\u{2220}"),
    ("aopf;", "\u{1D552}"),
    ("apos;", "'"),
    ("ascr;", "\u{1D4B6}"),
    ("ast;", "*"),
    ("asymp;", "\u{2248}"),
    ("bdquo;", "\u{201E}"),
    ("beta;", "\u{03B2}"),
    ("bsol;", "\\"),
    ("bull;", "\u{2022}"),
    ("cap;", "\u{2229}"),
    ("chi;", "\u{03C7}"),
    ("circ;", "\u{02C6}"),
    ("clubs;", "\u{2663}"),
    ("colon;", ":"),
    ("comma;", ","),
    ("commat;", "@"),
    ("cong;", "\u{2245}"),
    ("crarr;", "\u{21B5}"),
    ("cup;", "\u{222A}"),
    ("dArr;", "\u{21D3}"),
    ("dagger;", "\u{2020}"),
    ("darr;", "\u{2193}"),
    ("delta;", "\u{03B4}"),
    ("diams;", "\u{2666}"),
    ("dollar;", "$"),
    ("emsp;", "\u{2003}"),
    ("ensp;", "\u{2002}"),
    ("epsilon;", "\u{03B5}"),
    ("equals;", "="),
    ("equiv;", "\u{2261}"),
    ("eta;", "\u{03B7}"),
    ("empty;", "\u{2205}"),
    ("euro;", "\u{20AC}"),
    ("excl;", "!"),
    ("exist;", "\u{2203}"),
    ("fjlig;", "fj"),
    ("fnof;", "\u{0192}"),
    ("forall;", "\u{2200}"),
    ("frasl;", "\u{2044}"),
    ("gamma;", "\u{03B3}"),
    ("ge;", "\u{2265}"),
    ("grave;", "`"),
    ("hArr;", "\u{21D4}"),
    ("harr;", "\u{2194}"),
    ("hearts;", "\u{2665}"),
    ("hellip;", "\u{2026}"),
    ("image;", "\u{2111}"),
    ("infin;", "\u{221E}"),
    ("int;", "\u{222B}"),
    ("iota;", "\u{03B9}"),
    ("isin;", "\u{2208}"),
    ("kappa;", "\u{03BA}"),
    ("lArr;", "\u{21D0}"),
    ("lambda;", "\u{03BB}"),
    ("lang;", "\u{27E8}"),
    ("larr;", "\u{2190}"),
    ("lceil;", "\u{2308}"),
    ("lcub;", "{"),
    ("ldquo;", "\u{201C}"),
    ("le;", "\u{2264}"),
    ("lfloor;", "\u{230A}"),
    ("lowast;", "\u{2217}"),
    ("lowbar;", "_"),
    ("loz;", "\u{25CA}"),
    ("lpar;", "("),
    ("lrm;", "\u{200E}"),
    ("lsaquo;", "\u{2039}"),
    ("lsqb;", "["),
    ("lsquo;", "\u{2018}"),
    ("mdash;", "\u{2014}"),
    ("minus;", "\u{2212}"),
    ("mu;", "\u{03BC}"),
    ("nabla;", "\u{2207}"),
    ("ndash;", "\u{2013}"),
    ("ne;", "\u{2260}"),
    ("ni;", "\u{220B}"),
    ("notin;", "\u{2209}"),
    ("nsub;", "\u{2284}"),
    ("nu;", "\u{03BD}"),
    ("oelig;", "\u{0153}"),
    ("oline;", "\u{203E}"),
    ("omega;", "\u{03C9}"),
    ("omicron;", "\u{03BF}"),
    ("oplus;", "\u{2295}"),
    ("or;", "\u{2228}"),
    ("otimes;", "\u{2297}"),
    ("part;", "\u{2202}"),
    ("percnt;", "%"),
    ("period;", "."),
    ("permil;", "\u{2030}"),
    ("perp;", "\u{22A5}"),
    ("phi;", "\u{03C6}"),
    ("pi;", "\u{03C0}"),
    ("piv;", "\u{03D6}"),
    ("plus;", "+"),
    ("prime;", "\u{2032}"),
    ("prod;", "\u{220F}"),
    ("prop;", "\u{221D}"),
    ("psi;", "\u{03C8}"),
    ("quest;", "?"),
    ("rArr;", "\u{21D2}"),
    ("radic;", "\u{221A}"),
    ("rang;", "\u{27E9}"),
    ("rarr;", "\u{2192}"),
    ("rceil;", "\u{2309}"),
    ("rcub;", "}"),
    ("rdquo;", "\u{201D}"),
    ("real;", "\u{211C}"),
    ("rfloor;", "\u{230B}"),
    ("rho;", "\u{03C1}"),
    ("rlm;", "\u{200F}"),
    ("rpar;", ")"),
    ("rsaquo;", "\u{203A}"),
    ("rsqb;", "]"),
    ("rsquo;", "\u{2019}"),
    ("sbquo;", "\u{201A}"),
    ("scaron;", "\u{0161}"),
    ("sdot;", "\u{22C5}"),
    ("semi;", ";"),
    ("sigma;", "\u{03C3}"),
    ("sigmaf;", "\u{03C2}"),
    ("sim;", "\u{223C}"),
    ("sol;", "/"),
    ("spades;", "\u{2660}"),
    ("sub;", "\u{2282}"),
    ("sube;", "\u{2286}"),
    ("sum;", "\u{2211}"),
    ("sup;", "\u{2283}"),
    ("supe;", "\u{2287}"),
    ("tau;", "\u{03C4}"),
    ("there4;", "\u{2234}"),
    ("theta;", "\u{03B8}"),
    ("thetasym;", "\u{03D1}"),
    ("thinsp;", "\u{2009}"),
    ("tilde;", "\u{02DC}"),
    ("trade;", "\u{2122}"),
    ("uArr;", "\u{21D1}"),
    ("uarr;", "\u{2191}"),
    ("upsih;", "\u{03D2}"),
    ("upsilon;", "\u{03C5}"),
    ("verbar;", "|"),
    ("weierp;", "\u{2118}"),
    ("xi;", "\u{03BE}"),
    ("zeta;", "\u{03B6}"),
    ("zwj;", "\u{200D}"),
    ("zwnj;", "\u{200C}"),
];
